use std::sync::Arc;

use tokio::sync::watch;

use crate::lrc::LyricLine;

/// A snapshot of what should be on screen right now.
///
/// `lines` is shared by reference so that every published snapshot for the
/// same track points at the same allocation; consumers can use pointer
/// equality to tell track changes apart from index changes. An empty `lines`
/// with `err` unset means no lyrics were found; with `err` set it carries the
/// failure to display.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub lines: Arc<Vec<LyricLine>>,
    pub index: usize,
    pub playing: bool,
    pub err: Option<String>,
}

/// Latest-only broadcast of [`Update`]s to renderers.
///
/// Built on a watch channel: a slow consumer never queues stale snapshots, it
/// simply observes the newest one when it next looks.
#[derive(Debug, Clone)]
pub struct UpdateBus {
    tx: watch::Sender<Update>,
}

impl UpdateBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Update::default());
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Update> {
        self.tx.subscribe()
    }

    /// Publish a new snapshot, replacing any unobserved previous one.
    pub fn publish(&self, update: Update) {
        // Send only fails when every receiver is gone, which is fine: the
        // session keeps running and renderers can resubscribe.
        let _ = self.tx.send(update);
    }
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_subscribers_see_latest_only() {
        let bus = UpdateBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Update {
            index: 1,
            ..Update::default()
        });
        bus.publish(Update {
            index: 2,
            ..Update::default()
        });

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().index, 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = UpdateBus::new();
        bus.publish(Update::default());
    }

    #[test]
    fn test_shared_lines_pointer_equality() {
        let lines = Arc::new(vec![LyricLine {
            time: Duration::from_secs(1),
            text: "one".to_string(),
        }]);
        let a = Update {
            lines: Arc::clone(&lines),
            index: 0,
            playing: true,
            err: None,
        };
        let b = Update {
            lines: Arc::clone(&lines),
            index: 1,
            playing: true,
            err: None,
        };
        assert!(Arc::ptr_eq(&a.lines, &b.lines));
    }
}
