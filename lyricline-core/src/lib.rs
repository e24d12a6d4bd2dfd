pub mod config;
pub mod error;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod session;
pub mod source;
pub mod time;
pub mod tracker;
pub mod update;

pub use config::{Config, DisplayMode, LoggingConfig, LyricsConfig, PlayerConfig, UiConfig};
pub use error::{CoreError, Result};
pub use lrc::{LyricLine, LyricSet};
pub use paths::{
    config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME,
};
pub use playback::{normalize_text, PositionClock, Track, TrackIdentity};
pub use provider::{LyricsProvider, LyricsQuery, LyricsResult};
pub use session::{SessionController, SessionOptions};
pub use source::{PlayerEvent, PlayerSource};
pub use time::{duration_from_micros, DurationExt};
pub use tracker::{index_at, LineTracker};
pub use update::{Update, UpdateBus};
