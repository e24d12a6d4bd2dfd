use std::time::Duration;

/// A single lyric line with its start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// Playback position at which this line becomes current.
    pub time: Duration,
    /// Line text, never empty.
    pub text: String,
}

/// An ordered set of timed lyric lines.
///
/// Lines are sorted ascending by time; equal times are permitted. The set may
/// be empty when a track has no usable synchronized lyrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricSet {
    pub lines: Vec<LyricLine>,
}

/// Upper bound accepted for a single timestamp (100 hours).
const MAX_TIMESTAMP_SECS: f64 = 360_000.0;

impl LyricSet {
    /// Parse an LRC payload into a sorted line set.
    ///
    /// Each line must start with one or more `[mm:ss.xx]` timestamps; lines
    /// without a well-formed leading timestamp are dropped, as are lines whose
    /// remaining text is empty. A line carrying several leading timestamps
    /// yields one entry per timestamp.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut lines = Vec::new();

        for raw in input.lines() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            if let Some(parsed) = parse_lyric_line(raw) {
                lines.extend(parsed);
            }
        }

        lines.sort_by_key(|l| l.time);
        Self { lines }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Parse a lyric line like `[00:12.34]Hello` or `[00:05.00][00:15.00]Hello`.
fn parse_lyric_line(line: &str) -> Option<Vec<LyricLine>> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    // Collect every timestamp at the start of the line
    while remaining.starts_with('[') {
        let Some(end) = remaining.find(']') else { break };
        let Some(time) = parse_timestamp(&remaining[1..end]) else {
            break;
        };
        timestamps.push(time);
        remaining = &remaining[end + 1..];
    }

    if timestamps.is_empty() {
        return None;
    }

    let text = remaining.trim();
    if text.is_empty() {
        return None;
    }

    Some(
        timestamps
            .into_iter()
            .map(|time| LyricLine {
                time,
                text: text.to_string(),
            })
            .collect(),
    )
}

/// Parse a timestamp string like `00:12.34`, `00:12` or `00:12:34`.
fn parse_timestamp(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.trim().split(':').collect();

    match parts.len() {
        2 => {
            // mm:ss or mm:ss.xx
            let minutes: u32 = parts[0].parse().ok()?;
            let seconds: f64 = parts[1].parse().ok()?;
            if !seconds.is_finite() || !(0.0..=MAX_TIMESTAMP_SECS).contains(&seconds) {
                return None;
            }
            Some(Duration::from_secs_f64(f64::from(minutes) * 60.0 + seconds))
        }
        3 => {
            // mm:ss:xx (hundredths)
            let minutes: u32 = parts[0].parse().ok()?;
            let seconds: u32 = parts[1].parse().ok()?;
            let hundredths: u32 = parts[2].parse().ok()?;
            Some(Duration::from_millis(
                u64::from(minutes) * 60_000 + u64::from(seconds) * 1000 + u64::from(hundredths) * 10,
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let set = LyricSet::parse("[00:12.34]Hello world");
        assert_eq!(set.len(), 1);
        assert_eq!(set.lines[0].time, Duration::from_millis(12340));
        assert_eq!(set.lines[0].text, "Hello world");
    }

    #[test]
    fn test_parse_multiple_lines_sorted() {
        let input = "[00:12.34]Hello\n[bad]\n[01:00.00]  \n[00:05.00]World";
        let set = LyricSet::parse(input);
        assert_eq!(set.len(), 2);
        assert_eq!(set.lines[0].time, Duration::from_secs(5));
        assert_eq!(set.lines[0].text, "World");
        assert_eq!(set.lines[1].time, Duration::from_millis(12340));
        assert_eq!(set.lines[1].text, "Hello");
    }

    #[test]
    fn test_parse_drops_malformed_bracket() {
        let set = LyricSet::parse("[not a time]Skipped\n[00:10.00]Kept");
        assert_eq!(set.len(), 1);
        assert_eq!(set.lines[0].text, "Kept");
    }

    #[test]
    fn test_parse_drops_empty_text() {
        let set = LyricSet::parse("[00:10.00]\n[00:20.00]   \n[00:30.00]Kept");
        assert_eq!(set.len(), 1);
        assert_eq!(set.lines[0].text, "Kept");
    }

    #[test]
    fn test_parse_drops_id_tags() {
        let input = "[ti:Song Title]\n[ar:Artist Name]\n[00:05.00]Lyrics here";
        let set = LyricSet::parse(input);
        assert_eq!(set.len(), 1);
        assert_eq!(set.lines[0].text, "Lyrics here");
    }

    #[test]
    fn test_parse_multi_timestamp_line() {
        let set = LyricSet::parse("[00:05.00][00:15.00]Repeated lyric");
        assert_eq!(set.len(), 2);
        assert_eq!(set.lines[0].time, Duration::from_secs(5));
        assert_eq!(set.lines[1].time, Duration::from_secs(15));
        assert_eq!(set.lines[0].text, "Repeated lyric");
        assert_eq!(set.lines[1].text, "Repeated lyric");
    }

    #[test]
    fn test_parse_mm_ss_format() {
        let set = LyricSet::parse("[01:30]No fraction");
        assert_eq!(set.lines[0].time, Duration::from_secs(90));
    }

    #[test]
    fn test_parse_colon_hundredths_format() {
        // Some LRC files use mm:ss:xx (colon instead of dot for hundredths)
        let set = LyricSet::parse("[00:12:34]Hello world");
        assert_eq!(set.len(), 1);
        assert_eq!(set.lines[0].time, Duration::from_millis(12340));
    }

    #[test]
    fn test_parse_cjk_text() {
        let set = LyricSet::parse("[00:05.00]\u{4f60}\u{597d}\u{4e16}\u{754c}");
        assert_eq!(set.lines[0].text, "\u{4f60}\u{597d}\u{4e16}\u{754c}");
    }

    #[test]
    fn test_parse_blank_lines_ignored() {
        let set = LyricSet::parse("\n[00:05.00]First\n\n[00:10.00]Second\n\n");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_rejects_negative_seconds() {
        let set = LyricSet::parse("[00:-5.00]Nope");
        assert!(set.is_empty());
    }

    #[test]
    fn test_parse_rejects_absurd_seconds() {
        let set = LyricSet::parse("[00:1e300]Nope");
        assert!(set.is_empty());
    }

    #[test]
    fn test_parse_empty_payload() {
        assert!(LyricSet::parse("").is_empty());
        assert!(LyricSet::parse("just some text\nwithout timestamps").is_empty());
    }

    #[test]
    fn test_parse_keeps_equal_times() {
        let set = LyricSet::parse("[00:05.00]One\n[00:05.00]Two");
        assert_eq!(set.len(), 2);
    }
}
