use async_trait::async_trait;

use crate::error::Result;
use crate::lrc::LyricSet;

/// Metadata used to look up lyrics for a track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsQuery {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    #[must_use]
    pub fn new(track_name: &str, artist_name: &str) -> Self {
        Self {
            track_name: track_name.to_string(),
            artist_name: artist_name.to_string(),
            album_name: None,
            duration_secs: None,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album_name: &str) -> Self {
        if !album_name.is_empty() {
            self.album_name = Some(album_name.to_string());
        }
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

/// Outcome of a lyrics lookup.
///
/// A provider that reaches its backend but finds nothing usable reports
/// [`LyricsResult::NotFound`]; errors are reserved for failures to get an
/// answer at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsResult {
    /// Synchronized lyrics were found and parsed.
    Synced(LyricSet),
    /// The provider has no synchronized lyrics for this track.
    NotFound,
}

impl LyricsResult {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    #[must_use]
    pub fn as_synced(&self) -> Option<&LyricSet> {
        match self {
            Self::Synced(set) => Some(set),
            Self::NotFound => None,
        }
    }
}

/// A source of synchronized lyrics.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Look up lyrics for the given track.
    ///
    /// # Errors
    ///
    /// Returns an error when no answer could be obtained, e.g. the backend is
    /// unreachable. "Looked and found nothing" is [`LyricsResult::NotFound`],
    /// not an error.
    async fn fetch(&self, query: &LyricsQuery) -> Result<LyricsResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_skips_empty_album() {
        let query = LyricsQuery::new("Title", "Artist").with_album("");
        assert_eq!(query.album_name, None);

        let query = LyricsQuery::new("Title", "Artist").with_album("Album");
        assert_eq!(query.album_name.as_deref(), Some("Album"));
    }

    #[test]
    fn test_result_accessors() {
        let found = LyricsResult::Synced(LyricSet::parse("[00:05.00]Hi"));
        assert!(found.is_found());
        assert_eq!(found.as_synced().map(LyricSet::len), Some(1));

        let missing = LyricsResult::NotFound;
        assert!(!missing.is_found());
        assert!(missing.as_synced().is_none());
    }
}
