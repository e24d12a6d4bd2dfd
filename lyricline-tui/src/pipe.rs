//! Stdout renderers for the `line` and `json` display modes.

use std::io::{self, Write};
use std::sync::Arc;

use lyricline_core::Update;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Print each newly current lyric line to stdout.
///
/// Only line changes are printed: pause/resume flips and re-published
/// snapshots of the same line stay silent, and tracks without synced lyrics
/// print nothing at all.
///
/// # Errors
///
/// Returns an error when stdout cannot be written, e.g. a closed pipe.
pub async fn run_lines(
    mut updates: watch::Receiver<Update>,
    cancel_token: CancellationToken,
) -> io::Result<()> {
    let mut stdout = io::stdout();
    let mut last: Option<Update> = None;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => return Ok(()),
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let update = updates.borrow_and_update().clone();
                if let Some(line) = next_line_to_print(last.as_ref(), &update) {
                    writeln!(stdout, "{line}")?;
                    stdout.flush()?;
                }
                last = Some(update);
            }
        }
    }
}

/// The line a new snapshot should print, if any.
fn next_line_to_print(last: Option<&Update>, update: &Update) -> Option<String> {
    let line = update.lines.get(update.index)?;
    if let Some(prev) = last {
        if Arc::ptr_eq(&prev.lines, &update.lines) && prev.index == update.index {
            return None;
        }
    }
    Some(line.text.clone())
}

/// One status-bar payload per published snapshot, waybar custom-module style.
#[derive(Serialize)]
struct BarPayload<'a> {
    text: &'a str,
    class: &'a str,
}

/// Print a JSON object per update to stdout, for status bars.
///
/// # Errors
///
/// Returns an error when stdout cannot be written or the payload fails to
/// serialize.
pub async fn run_json(
    mut updates: watch::Receiver<Update>,
    cancel_token: CancellationToken,
) -> io::Result<()> {
    let mut stdout = io::stdout();

    // Status bars expect output promptly on startup, so emit the current
    // (initially empty) state before waiting for changes.
    write_payload(&mut stdout, &updates.borrow().clone())?;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => return Ok(()),
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let update = updates.borrow_and_update().clone();
                write_payload(&mut stdout, &update)?;
            }
        }
    }
}

fn write_payload(stdout: &mut io::Stdout, update: &Update) -> io::Result<()> {
    let json = serde_json::to_string(&payload_for(update)).map_err(io::Error::other)?;
    writeln!(stdout, "{json}")?;
    stdout.flush()
}

fn payload_for(update: &Update) -> BarPayload<'_> {
    let text = update
        .lines
        .get(update.index)
        .map_or("", |line| line.text.as_str());
    let class = if update.err.is_some() {
        "error"
    } else if update.playing {
        "playing"
    } else {
        "paused"
    };
    BarPayload { text, class }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use lyricline_core::LyricLine;

    fn lines(texts: &[&str]) -> Arc<Vec<LyricLine>> {
        Arc::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| LyricLine {
                    time: Duration::from_secs(u64::try_from(i).unwrap() * 10),
                    text: (*text).to_string(),
                })
                .collect(),
        )
    }

    fn update(lines: &Arc<Vec<LyricLine>>, index: usize, playing: bool) -> Update {
        Update {
            lines: Arc::clone(lines),
            index,
            playing,
            err: None,
        }
    }

    #[test]
    fn test_first_snapshot_prints_current_line() {
        let lyrics = lines(&["Hello", "World"]);
        let printed = next_line_to_print(None, &update(&lyrics, 0, true));
        assert_eq!(printed, Some("Hello".to_string()));
    }

    #[test]
    fn test_same_line_is_suppressed() {
        let lyrics = lines(&["Hello", "World"]);
        let prev = update(&lyrics, 1, true);
        let next = update(&lyrics, 1, false);
        assert_eq!(next_line_to_print(Some(&prev), &next), None);
    }

    #[test]
    fn test_index_change_prints() {
        let lyrics = lines(&["Hello", "World"]);
        let prev = update(&lyrics, 0, true);
        let next = update(&lyrics, 1, true);
        assert_eq!(
            next_line_to_print(Some(&prev), &next),
            Some("World".to_string())
        );
    }

    #[test]
    fn test_new_track_same_index_prints() {
        let first = lines(&["Hello"]);
        let second = lines(&["Hello"]);
        let prev = update(&first, 0, true);
        let next = update(&second, 0, true);
        assert_eq!(
            next_line_to_print(Some(&prev), &next),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_empty_lines_print_nothing() {
        let empty = Arc::new(Vec::new());
        assert_eq!(next_line_to_print(None, &update(&empty, 0, false)), None);
    }

    #[test]
    fn test_payload_reports_playing_state() {
        let lyrics = lines(&["Hello"]);
        let playing = update(&lyrics, 0, true);
        let payload = payload_for(&playing);
        assert_eq!(payload.text, "Hello");
        assert_eq!(payload.class, "playing");

        let paused = update(&lyrics, 0, false);
        let payload = payload_for(&paused);
        assert_eq!(payload.class, "paused");
    }

    #[test]
    fn test_payload_empty_when_no_lyrics() {
        let update = Update::default();
        let payload = payload_for(&update);
        assert_eq!(payload.text, "");
        assert_eq!(payload.class, "paused");
    }

    #[test]
    fn test_payload_error_class() {
        let update = Update {
            err: Some("provider down".to_string()),
            ..Update::default()
        };
        assert_eq!(payload_for(&update).class, "error");
    }
}
