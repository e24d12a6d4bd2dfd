use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// How often playback state is sampled from the bus, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Position jumps larger than this are treated as seeks, in milliseconds.
    #[serde(default = "default_seek_threshold")]
    pub seek_threshold_ms: u64,
}

const fn default_poll_interval() -> u64 {
    1000
}

const fn default_seek_threshold() -> u64 {
    2000
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            seek_threshold_ms: default_seek_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Include the track duration in the exact-match lookup key.
    #[serde(default = "default_true")]
    pub match_duration: bool,
    /// Base URL of the lrclib-compatible API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

const fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://lrclib.net/api".to_string()
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            match_duration: default_true(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub mode: DisplayMode,
    /// Context lines shown above and below the current line in screen mode.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

const fn default_context_lines() -> usize {
    3
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            context_lines: default_context_lines(),
        }
    }
}

/// How resolved lyrics are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Print each newly current line to stdout, for piping.
    Line,
    /// Full-screen terminal UI.
    #[default]
    Screen,
    /// Waybar-style JSON objects on stdout.
    Json,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "screen" => Ok(Self::Screen),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown display mode {other:?} (expected \"line\", \"screen\", or \"json\")"
            )),
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Line => "line",
            Self::Screen => "screen",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Write logs to `~/.config/lyricline/lyricline.log`.
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Get the configuration directory path (~/.config/lyricline/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricline/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run.
    ///
    /// A path override replaces the default location; overridden paths must
    /// already exist (no template is written for them).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if a
    /// field fails validation.
    pub fn load_or_create(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map_or_else(Self::config_path, Path::to_path_buf);

        if !config_path.exists() {
            if path.is_some() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("config file {} does not exist", config_path.display()),
                });
            }

            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            // Write template config
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.player.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.lyrics.api_url.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.api_url must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# lyricline configuration
# ~/.config/lyricline/config.toml

[player]
# How often playback state is sampled from the MPRIS bus (milliseconds)
poll_interval_ms = 1000
# Position jumps larger than this are treated as seeks (milliseconds)
seek_threshold_ms = 2000

[lyrics]
# Require the track duration to match in the exact lookup.
# Disable if your player reports unreliable track lengths.
match_duration = true
# Base URL of the lrclib-compatible API
api_url = "https://lrclib.net/api"

[ui]
# Display mode: "screen" (full terminal UI), "line" (print each line to
# stdout), or "json" (waybar-style JSON objects on stdout)
mode = "screen"
# Context lines shown above and below the current line in screen mode
context_lines = 3

[logging]
# Write logs to ~/.config/lyricline/lyricline.log
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.player.poll_interval_ms, 1000);
        assert_eq!(config.player.seek_threshold_ms, 2000);
        assert!(config.lyrics.match_duration);
        assert_eq!(config.lyrics.api_url, "https://lrclib.net/api");
        assert_eq!(config.ui.mode, DisplayMode::Screen);
        assert_eq!(config.ui.context_lines, 3);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.player.poll_interval_ms, 1000);
        assert_eq!(config.ui.mode, DisplayMode::Screen);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config = toml::from_str("[player]\npoll_interval_ms = 250\n").unwrap();
        assert_eq!(config.player.poll_interval_ms, 250);
        assert_eq!(config.player.seek_threshold_ms, 2000);
    }

    #[test]
    fn test_display_mode_from_str() {
        assert_eq!("line".parse::<DisplayMode>().unwrap(), DisplayMode::Line);
        assert_eq!("screen".parse::<DisplayMode>().unwrap(), DisplayMode::Screen);
        assert_eq!("json".parse::<DisplayMode>().unwrap(), DisplayMode::Json);
        assert!("karaoke".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let config: Config = toml::from_str("[player]\npoll_interval_ms = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(CoreError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_api_url() {
        let config: Config = toml::from_str("[lyrics]\napi_url = \"\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(CoreError::ConfigInvalid { .. })
        ));
    }
}
