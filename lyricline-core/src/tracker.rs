use std::time::Duration;

use crate::lrc::LyricLine;

/// How far the incremental lookup walks from its previous index before
/// falling back to a binary search.
const NEAR_WINDOW: usize = 16;

/// Index of the line current at `position`: the greatest `i` with
/// `lines[i].time <= position`.
///
/// Positions before the first line map to 0, positions past the last line map
/// to the last index, and an empty slice maps to 0.
#[must_use]
pub fn index_at(lines: &[LyricLine], position: Duration) -> usize {
    lines
        .partition_point(|line| line.time <= position)
        .saturating_sub(1)
}

/// Incremental current-line lookup.
///
/// Playback positions between consecutive lookups usually move by a fraction
/// of a second, so the answer is almost always at or next to the previous
/// index. The tracker walks outward from its last answer and only falls back
/// to [`index_at`] after a long jump, e.g. a seek.
#[derive(Debug, Clone, Default)]
pub struct LineTracker {
    index: usize,
}

impl LineTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently computed index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance to the line current at `position` and return its index.
    pub fn advance(&mut self, lines: &[LyricLine], position: Duration) -> usize {
        self.index = locate(lines, position, self.index);
        self.index
    }
}

fn locate(lines: &[LyricLine], position: Duration, hint: usize) -> usize {
    let n = lines.len();
    if n <= 1 {
        return 0;
    }
    let hint = hint.min(n - 1);

    if position >= lines[hint].time {
        // Walk forward: the answer is the last index whose time has passed.
        let stop = (hint + 1 + NEAR_WINDOW).min(n);
        for i in hint + 1..stop {
            if position < lines[i].time {
                return i - 1;
            }
        }
        if stop == n {
            n - 1
        } else {
            index_at(lines, position)
        }
    } else {
        // Walk backward until a line at or before the position appears.
        let floor = hint.saturating_sub(NEAR_WINDOW);
        for i in (floor + 1..=hint).rev() {
            if lines[i - 1].time <= position {
                return i - 1;
            }
        }
        if floor == 0 {
            0
        } else {
            index_at(lines, position)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(times_ms: &[u64]) -> Vec<LyricLine> {
        times_ms
            .iter()
            .map(|&ms| LyricLine {
                time: Duration::from_millis(ms),
                text: format!("line at {ms}"),
            })
            .collect()
    }

    #[test]
    fn test_index_at_boundaries() {
        let lines = lines(&[5_000, 10_000, 20_000]);
        assert_eq!(index_at(&lines, Duration::ZERO), 0);
        assert_eq!(index_at(&lines, Duration::from_millis(4_999)), 0);
        assert_eq!(index_at(&lines, Duration::from_secs(5)), 0);
        assert_eq!(index_at(&lines, Duration::from_secs(10)), 1);
        assert_eq!(index_at(&lines, Duration::from_millis(19_999)), 1);
        assert_eq!(index_at(&lines, Duration::from_secs(20)), 2);
        assert_eq!(index_at(&lines, Duration::from_secs(500)), 2);
    }

    #[test]
    fn test_index_at_empty() {
        assert_eq!(index_at(&[], Duration::from_secs(42)), 0);
    }

    #[test]
    fn test_index_at_equal_times() {
        let lines = lines(&[5_000, 5_000, 10_000]);
        // The greatest index whose time has passed wins.
        assert_eq!(index_at(&lines, Duration::from_secs(5)), 1);
    }

    #[test]
    fn test_tracker_monotonic_playback() {
        let lines = lines(&[1_000, 2_000, 3_000, 4_000, 5_000]);
        let mut tracker = LineTracker::new();
        for ms in (0..6_000).step_by(250) {
            let position = Duration::from_millis(ms);
            assert_eq!(
                tracker.advance(&lines, position),
                index_at(&lines, position),
                "diverged at {ms}ms"
            );
        }
    }

    #[test]
    fn test_tracker_backward_seek() {
        let lines = lines(&[1_000, 2_000, 3_000, 4_000, 5_000]);
        let mut tracker = LineTracker::new();
        tracker.advance(&lines, Duration::from_millis(4_500));
        assert_eq!(tracker.index(), 3);
        assert_eq!(tracker.advance(&lines, Duration::from_millis(1_500)), 0);
    }

    #[test]
    fn test_tracker_long_jumps_match_index_at() {
        let times: Vec<u64> = (0..200).map(|i| i * 1_000).collect();
        let lines = lines(&times);
        let mut tracker = LineTracker::new();
        for ms in [0, 199_000, 50_500, 51_000, 3_000, 150_000, 149_999, 0] {
            let position = Duration::from_millis(ms);
            assert_eq!(
                tracker.advance(&lines, position),
                index_at(&lines, position),
                "diverged at {ms}ms"
            );
        }
    }

    #[test]
    fn test_tracker_single_line() {
        let lines = lines(&[10_000]);
        let mut tracker = LineTracker::new();
        assert_eq!(tracker.advance(&lines, Duration::ZERO), 0);
        assert_eq!(tracker.advance(&lines, Duration::from_secs(60)), 0);
    }

    #[test]
    fn test_tracker_stale_hint_after_shrink() {
        let long = lines(&[1_000, 2_000, 3_000, 4_000, 5_000]);
        let short = lines(&[1_000]);
        let mut tracker = LineTracker::new();
        tracker.advance(&long, Duration::from_secs(5));
        assert_eq!(tracker.index(), 4);
        // A stale hint past the end of a smaller set must not panic.
        assert_eq!(tracker.advance(&short, Duration::from_secs(5)), 0);
    }
}
