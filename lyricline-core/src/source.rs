use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::playback::Track;

/// Playback events observed from a media player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A different track started, or a player appeared with one loaded.
    TrackChanged {
        track: Track,
        position: Duration,
        playing: bool,
    },
    /// Playback jumped within the current track.
    Seeked { position: Duration },
    /// A periodic observation of the current track.
    Sample { position: Duration, playing: bool },
    /// The player disappeared or stopped exposing a track.
    PlayerGone,
}

/// Watches a media player and emits [`PlayerEvent`]s.
#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Short source name used in logs.
    fn name(&self) -> &'static str;

    /// Observe the player until cancelled. Reconnection after a lost player is
    /// the source's responsibility.
    ///
    /// # Errors
    ///
    /// Returns an error only when the source gave up for good, e.g. the
    /// session bus itself is unreachable.
    async fn run(&self) -> Result<()>;

    /// Get the cancellation token for this source.
    fn cancel_token(&self) -> CancellationToken;

    /// Signal the source to stop.
    fn stop(&self) {
        self.cancel_token().cancel();
    }
}
