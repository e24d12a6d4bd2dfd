use async_trait::async_trait;
use lyricline_core::{CoreError, LyricSet, LyricsProvider, LyricsQuery, LyricsResult};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default LRCLIB instance.
pub const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// LRCLIB.net lyrics provider.
///
/// Lookups go through two phases: a `/get` signature lookup with the full
/// track metadata, then on a miss a `/search` free-text query. Only
/// synchronized lyrics are accepted; plain lyrics and instrumental entries
/// count as not found.
pub struct LrclibProvider {
    client: ClientWithMiddleware,
    api_url: String,
}

impl LrclibProvider {
    /// Create a provider against the default LRCLIB instance, with a
    /// 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_api_url(LRCLIB_API_URL)
    }

    /// Create a provider against a custom LRCLIB-compatible instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_api_url(api_url: &str) -> Result<Self, CoreError> {
        // Base client with timeout
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!(
                "lyricline/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/lyricline/lyricline)"
            ))
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Response from the LRCLIB API.
/// The API returns additional fields (trackName, albumName, plainLyrics) that
/// we don't use; serde ignores unknown fields by default.
#[derive(Debug, Deserialize)]
struct LrclibResponse {
    id: i64,
    instrumental: bool,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<LyricsResult, CoreError> {
        info!(
            "Fetching lyrics from LRCLIB for: {} - {} (duration: {:?}s)",
            query.artist_name, query.track_name, query.duration_secs
        );

        let url = get_url(&self.api_url, query);
        debug!("LRCLIB GET (exact match): {url}");

        let response = self.client.get(&url).send().await?;

        // 404 means no exact signature match; 400 means the signature itself
        // was unusable (e.g. a blank field). Either way the search endpoint
        // may still know the track.
        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::BAD_REQUEST
        {
            info!("LRCLIB exact match not found, falling back to search");
            return self.search(query).await;
        }

        if !response.status().is_success() {
            warn!("LRCLIB returned status: {}", response.status());
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB returned status: {}", response.status()),
            });
        }

        let result: LrclibResponse = response.json().await?;
        info!("LRCLIB found exact match with id: {}", result.id);
        Ok(parse_candidate(&result))
    }
}

impl LrclibProvider {
    /// Free-text search fallback. The first result with usable synced lyrics
    /// wins; results are already relevance-ordered by the API.
    async fn search(&self, query: &LyricsQuery) -> Result<LyricsResult, CoreError> {
        let url = search_url(&self.api_url, query);
        debug!("LRCLIB GET (search): {url}");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            warn!("LRCLIB search returned status: {}", response.status());
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB search returned status: {}", response.status()),
            });
        }

        let results: Vec<LrclibResponse> = response.json().await?;
        debug!("LRCLIB search returned {} candidates", results.len());

        let result = select_candidate(&results);
        if matches!(result, LyricsResult::NotFound) {
            info!(
                "LRCLIB has no synced lyrics for: {} - {}",
                query.artist_name, query.track_name
            );
        }
        Ok(result)
    }
}

/// Pick the first search candidate with usable synced lyrics.
fn select_candidate(results: &[LrclibResponse]) -> LyricsResult {
    for candidate in results {
        if let LyricsResult::Synced(set) = parse_candidate(candidate) {
            info!("LRCLIB found match via search (id: {})", candidate.id);
            return LyricsResult::Synced(set);
        }
    }
    LyricsResult::NotFound
}

fn get_url(api_url: &str, query: &LyricsQuery) -> String {
    let mut url = format!(
        "{api_url}/get?artist_name={}&track_name={}",
        urlencoding::encode(&query.artist_name),
        urlencoding::encode(&query.track_name)
    );

    if let Some(ref album) = query.album_name {
        let _ = write!(url, "&album_name={}", urlencoding::encode(album));
    }

    if let Some(duration) = query.duration_secs {
        let _ = write!(url, "&duration={duration}");
    }

    url
}

fn search_url(api_url: &str, query: &LyricsQuery) -> String {
    let q = format!("{} {}", query.artist_name, query.track_name);
    format!("{api_url}/search?q={}", urlencoding::encode(q.trim()))
}

fn parse_candidate(result: &LrclibResponse) -> LyricsResult {
    if result.instrumental {
        debug!("Track is instrumental (lrclib id: {})", result.id);
        return LyricsResult::NotFound;
    }

    let Some(synced) = result.synced_lyrics.as_deref() else {
        return LyricsResult::NotFound;
    };
    if synced.trim().is_empty() {
        return LyricsResult::NotFound;
    }

    let set = LyricSet::parse(synced);
    if set.is_empty() {
        debug!("Synced lyrics had no parseable lines (lrclib id: {})", result.id);
        return LyricsResult::NotFound;
    }

    debug!("Got synced lyrics with {} lines (lrclib id: {})", set.len(), result.id);
    LyricsResult::Synced(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> LyricsQuery {
        LyricsQuery::new("Bohemian Rhapsody", "Queen")
            .with_album("A Night at the Opera")
            .with_duration(355)
    }

    #[test]
    fn test_get_url_includes_all_fields() {
        let url = get_url("https://lrclib.net/api", &query());
        assert_eq!(
            url,
            "https://lrclib.net/api/get?artist_name=Queen&track_name=Bohemian%20Rhapsody\
             &album_name=A%20Night%20at%20the%20Opera&duration=355"
        );
    }

    #[test]
    fn test_get_url_omits_missing_fields() {
        let query = LyricsQuery::new("Song & Dance", "Artist");
        let url = get_url("https://lrclib.net/api", &query);
        assert_eq!(
            url,
            "https://lrclib.net/api/get?artist_name=Artist&track_name=Song%20%26%20Dance"
        );
    }

    #[test]
    fn test_search_url_encodes_free_text() {
        let url = search_url("https://lrclib.net/api", &query());
        assert_eq!(
            url,
            "https://lrclib.net/api/search?q=Queen%20Bohemian%20Rhapsody"
        );
    }

    #[test]
    fn test_search_url_trims_blank_artist() {
        let query = LyricsQuery::new("Instrumental Song", "");
        let url = search_url("https://lrclib.net/api", &query);
        assert_eq!(url, "https://lrclib.net/api/search?q=Instrumental%20Song");
    }

    #[test]
    fn test_parse_candidate_synced() {
        let candidate = LrclibResponse {
            id: 1,
            instrumental: false,
            synced_lyrics: Some("[00:05.00]Hello\n[00:10.00]World".to_string()),
        };
        match parse_candidate(&candidate) {
            LyricsResult::Synced(set) => assert_eq!(set.len(), 2),
            LyricsResult::NotFound => panic!("expected synced lyrics"),
        }
    }

    #[test]
    fn test_parse_candidate_instrumental() {
        let candidate = LrclibResponse {
            id: 2,
            instrumental: true,
            synced_lyrics: Some("[00:05.00]Should be ignored".to_string()),
        };
        assert_eq!(parse_candidate(&candidate), LyricsResult::NotFound);
    }

    #[test]
    fn test_parse_candidate_missing_or_blank() {
        let missing = LrclibResponse {
            id: 3,
            instrumental: false,
            synced_lyrics: None,
        };
        assert_eq!(parse_candidate(&missing), LyricsResult::NotFound);

        let blank = LrclibResponse {
            id: 4,
            instrumental: false,
            synced_lyrics: Some("   \n  ".to_string()),
        };
        assert_eq!(parse_candidate(&blank), LyricsResult::NotFound);
    }

    #[test]
    fn test_parse_candidate_unparseable() {
        let candidate = LrclibResponse {
            id: 5,
            instrumental: false,
            synced_lyrics: Some("no timestamps in here".to_string()),
        };
        assert_eq!(parse_candidate(&candidate), LyricsResult::NotFound);
    }

    #[test]
    fn test_select_candidate_empty_results() {
        assert_eq!(select_candidate(&[]), LyricsResult::NotFound);
    }

    #[test]
    fn test_select_candidate_skips_unusable() {
        let results = vec![
            LrclibResponse {
                id: 6,
                instrumental: true,
                synced_lyrics: None,
            },
            LrclibResponse {
                id: 7,
                instrumental: false,
                synced_lyrics: Some("[00:05.00]Found".to_string()),
            },
        ];
        match select_candidate(&results) {
            LyricsResult::Synced(set) => assert_eq!(set.lines[0].text, "Found"),
            LyricsResult::NotFound => panic!("expected synced lyrics"),
        }
    }

    #[test]
    fn test_with_api_url_trims_trailing_slash() {
        let provider = LrclibProvider::with_api_url("https://example.com/api/").unwrap();
        assert_eq!(provider.api_url, "https://example.com/api");
    }
}
