use std::time::{Duration, Instant};

/// Identifies a track for resolution and change detection.
///
/// Fields are normalized on construction so that metadata quirks (curly
/// quotes, stray whitespace) do not defeat provider lookups or cause spurious
/// track-change events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackIdentity {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl TrackIdentity {
    #[must_use]
    pub fn new(title: &str, artist: &str, album: &str) -> Self {
        Self {
            title: normalize_text(title),
            artist: normalize_text(artist),
            album: normalize_text(album),
        }
    }
}

/// A track as reported by a player, with optional duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub identity: TrackIdentity,
    pub length: Option<Duration>,
}

impl Track {
    #[must_use]
    pub fn new(identity: TrackIdentity, length: Option<Duration>) -> Self {
        Self { identity, length }
    }
}

/// Replace curly quotes with their ASCII equivalents and trim whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}

/// Estimates the current playback position between player samples.
///
/// The clock anchors a reported position to the instant it was observed. While
/// playing, the current position is the anchor plus elapsed wall time; while
/// paused it stays at the anchor. Estimates are clamped to the track length
/// when one is known.
#[derive(Debug, Clone)]
pub struct PositionClock {
    position: Duration,
    playing: bool,
    length: Option<Duration>,
    anchored_at: Instant,
}

impl PositionClock {
    #[must_use]
    pub fn new(position: Duration, playing: bool, length: Option<Duration>) -> Self {
        Self {
            position,
            playing,
            length,
            anchored_at: Instant::now(),
        }
    }

    /// Re-anchor the clock to a freshly observed position.
    pub fn anchor(&mut self, position: Duration, playing: bool) {
        self.position = position;
        self.playing = playing;
        self.anchored_at = Instant::now();
    }

    /// Reset the clock for a new track.
    pub fn reset(&mut self, position: Duration, playing: bool, length: Option<Duration>) {
        self.length = length;
        self.anchor(position, playing);
    }

    /// Estimated position right now.
    #[must_use]
    pub fn current(&self) -> Duration {
        let estimate = if self.playing {
            self.position + self.anchored_at.elapsed()
        } else {
            self.position
        };
        match self.length {
            Some(length) => estimate.min(length),
            None => estimate,
        }
    }

    #[must_use]
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Whether an observed position disagrees with the estimate by more than
    /// `threshold`, indicating a seek rather than ordinary playback drift.
    #[must_use]
    pub fn deviates(&self, observed: Duration, threshold: Duration) -> bool {
        let estimate = self.current();
        let delta = if observed > estimate {
            observed - estimate
        } else {
            estimate - observed
        };
        delta > threshold
    }
}
