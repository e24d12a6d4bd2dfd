//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use lyricline_core::{Config, DisplayMode};

#[derive(Parser, Debug)]
#[command(name = "lyricline")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Display mode: screen, line, or json
    #[arg(short = 'm', long, env = "LYRICLINE_MODE", value_name = "MODE")]
    pub mode: Option<DisplayMode>,

    /// Path to the configuration file
    #[arg(short = 'c', long, env = "LYRICLINE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How often playback state is sampled from the player, in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,
}

impl Args {
    /// Fold command-line overrides into the loaded configuration.
    #[must_use]
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.ui.mode = mode;
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.player.poll_interval_ms = poll_interval_ms;
        }
        config
    }
}
