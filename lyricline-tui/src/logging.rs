//! Tracing initialization with optional file logging.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use lyricline_core::{log_file_path, DisplayMode};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// The few config fields logging setup needs before the full config load.
#[derive(Debug, Default)]
pub struct LogProbe {
    pub file_logging_enabled: bool,
    pub mode: Option<DisplayMode>,
}

/// Partially parse the config file to decide how logging should be set up.
///
/// The full config load wants logging available for its own error reporting,
/// so this reads only `logging.enabled` and `ui.mode` and treats any missing
/// or unreadable file as defaults.
pub fn probe_config(path_override: Option<&Path>) -> LogProbe {
    #[derive(serde::Deserialize, Default)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
        #[serde(default)]
        ui: PartialUiConfig,
    }

    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    #[derive(serde::Deserialize, Default)]
    struct PartialUiConfig {
        mode: Option<DisplayMode>,
    }

    let config_path = path_override.map_or_else(lyricline_core::config_path, Path::to_path_buf);
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return LogProbe::default();
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|partial| LogProbe {
            file_logging_enabled: partial.logging.enabled,
            mode: partial.ui.mode,
        })
        .unwrap_or_default()
}

/// Initialize the tracing subscriber.
///
/// Console logs always go to stderr since stdout carries the lyrics output
/// in `line` and `json` modes. Screen mode owns the whole terminal, so its
/// console default is quieter; `RUST_LOG` overrides either default.
pub fn init_tracing(file_logging_enabled: bool, mode: DisplayMode) {
    let default_filter = match mode {
        DisplayMode::Screen => "warn",
        DisplayMode::Line | DisplayMode::Json => "info",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_missing_file_defaults() {
        let probe = probe_config(Some(Path::new("/nonexistent/lyricline/config.toml")));
        assert!(!probe.file_logging_enabled);
        assert!(probe.mode.is_none());
    }

    #[test]
    fn test_probe_reads_logging_and_mode() {
        let dir = std::env::temp_dir().join("lyricline-probe-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[logging]\nenabled = true\n\n[ui]\nmode = \"line\"\n").unwrap();

        let probe = probe_config(Some(&path));
        assert!(probe.file_logging_enabled);
        assert_eq!(probe.mode, Some(DisplayMode::Line));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_probe_tolerates_unknown_sections() {
        let dir = std::env::temp_dir().join("lyricline-probe-partial-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[player]\npoll_interval_ms = 250\n").unwrap();

        let probe = probe_config(Some(&path));
        assert!(!probe.file_logging_enabled);
        assert!(probe.mode.is_none());

        std::fs::remove_file(&path).unwrap();
    }
}
