use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::lrc::LyricLine;
use crate::playback::{PositionClock, Track};
use crate::provider::{LyricsProvider, LyricsQuery, LyricsResult};
use crate::source::PlayerEvent;
use crate::time::DurationExt;
use crate::tracker::LineTracker;
use crate::update::{Update, UpdateBus};

/// Tuning knobs for lyric sessions.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How often an active session re-evaluates the current line between
    /// player samples.
    pub tick_interval: Duration,
    /// Whether lyric lookups include the track duration for exact matching.
    pub match_duration: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            match_duration: true,
        }
    }
}

/// Owns the lifecycle of lyric sessions.
///
/// The controller consumes [`PlayerEvent`]s and maintains at most one session
/// at a time. A track change tears the previous session down and waits for its
/// task to finish before starting the next one, so a superseded session can
/// never publish after its replacement has started.
pub struct SessionController {
    provider: Arc<dyn LyricsProvider>,
    bus: UpdateBus,
    options: SessionOptions,
    events: mpsc::Receiver<PlayerEvent>,
    cancel_token: CancellationToken,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    track: Track,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    commands: mpsc::Sender<SessionCommand>,
}

enum SessionCommand {
    Sample { position: Duration, playing: bool },
    Seek { position: Duration },
}

impl SessionController {
    #[must_use]
    pub fn new(
        provider: Arc<dyn LyricsProvider>,
        bus: UpdateBus,
        options: SessionOptions,
        events: mpsc::Receiver<PlayerEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            provider,
            bus,
            options,
            events,
            cancel_token,
            active: None,
        }
    }

    /// Process player events until cancelled or the event channel closes.
    pub async fn run(mut self) {
        debug!("session controller started");
        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
            }
        }
        if let Some(session) = self.active.take() {
            shutdown_session(session).await;
        }
        debug!("session controller stopped");
    }

    async fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackChanged {
                track,
                position,
                playing,
            } => {
                let same_track = self
                    .active
                    .as_ref()
                    .is_some_and(|session| session.track.identity == track.identity);
                if same_track {
                    // Metadata re-announcements for the current track are
                    // treated as position samples.
                    self.forward(SessionCommand::Sample { position, playing });
                    return;
                }
                if let Some(session) = self.active.take() {
                    shutdown_session(session).await;
                }
                debug!(
                    title = %track.identity.title,
                    artist = %track.identity.artist,
                    "starting lyrics session"
                );
                self.active = Some(self.spawn_session(track, position, playing));
            }
            PlayerEvent::Seeked { position } => {
                self.forward(SessionCommand::Seek { position });
            }
            PlayerEvent::Sample { position, playing } => {
                self.forward(SessionCommand::Sample { position, playing });
            }
            PlayerEvent::PlayerGone => {
                if let Some(session) = self.active.take() {
                    debug!("player gone, stopping lyrics session");
                    shutdown_session(session).await;
                    self.bus.publish(Update::default());
                }
            }
        }
    }

    fn forward(&self, command: SessionCommand) {
        if let Some(session) = &self.active {
            // Never wait on the session task here: a full queue only happens
            // while a slow fetch is in flight, and the dropped observation is
            // superseded by the next poll anyway. A closed channel means the
            // task already finished (e.g. no lyrics were found).
            let _ = session.commands.try_send(command);
        }
    }

    fn spawn_session(&self, track: Track, position: Duration, playing: bool) -> ActiveSession {
        let cancel = self.cancel_token.child_token();
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let task = SessionTask {
            provider: Arc::clone(&self.provider),
            bus: self.bus.clone(),
            options: self.options.clone(),
            track: track.clone(),
            cancel: cancel.clone(),
            commands: commands_rx,
        };
        let handle = tokio::spawn(task.run(position, playing));
        ActiveSession {
            track,
            cancel,
            handle,
            commands: commands_tx,
        }
    }
}

async fn shutdown_session(session: ActiveSession) {
    session.cancel.cancel();
    if session.handle.await.is_err() {
        warn!("lyrics session task ended abnormally");
    }
}

/// A single track's session: resolve lyrics once, then track the current line
/// until cancelled.
struct SessionTask {
    provider: Arc<dyn LyricsProvider>,
    bus: UpdateBus,
    options: SessionOptions,
    track: Track,
    cancel: CancellationToken,
    commands: mpsc::Receiver<SessionCommand>,
}

impl SessionTask {
    async fn run(mut self, position: Duration, playing: bool) {
        let mut clock = PositionClock::new(position, playing, self.track.length);

        let query = self.build_query();
        debug!(
            provider = self.provider.name(),
            title = %self.track.identity.title,
            "resolving lyrics"
        );

        let resolved = tokio::select! {
            () = self.cancel.cancelled() => return,
            result = self.provider.fetch(&query) => result,
        };

        let lines: Arc<Vec<LyricLine>> = match resolved {
            Ok(LyricsResult::Synced(set)) if !set.is_empty() => Arc::new(set.lines),
            Ok(_) => {
                debug!(title = %self.track.identity.title, "no synced lyrics found");
                self.bus.publish(Update {
                    playing,
                    ..Update::default()
                });
                return;
            }
            Err(err) => {
                warn!(error = %err, "lyrics lookup failed");
                self.bus.publish(Update {
                    playing,
                    err: Some(err.to_string()),
                    ..Update::default()
                });
                return;
            }
        };
        debug!(lines = lines.len(), "lyrics resolved");

        let mut tracker = LineTracker::new();
        let mut last: Option<(usize, bool)> = None;
        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return,
                command = self.commands.recv() => {
                    match command {
                        Some(SessionCommand::Sample { position, playing }) => {
                            clock.anchor(position, playing);
                        }
                        Some(SessionCommand::Seek { position }) => {
                            let playing = clock.playing();
                            clock.anchor(position, playing);
                        }
                        None => return,
                    }
                    publish_if_changed(&self.bus, &lines, &mut tracker, &clock, &mut last);
                }
                _ = ticker.tick() => {
                    publish_if_changed(&self.bus, &lines, &mut tracker, &clock, &mut last);
                }
            }
        }
    }

    fn build_query(&self) -> LyricsQuery {
        let identity = &self.track.identity;
        let mut query =
            LyricsQuery::new(&identity.title, &identity.artist).with_album(&identity.album);
        if self.options.match_duration {
            if let Some(length) = self.track.length {
                query = query.with_duration(length.as_secs_u32());
            }
        }
        query
    }
}

fn publish_if_changed(
    bus: &UpdateBus,
    lines: &Arc<Vec<LyricLine>>,
    tracker: &mut LineTracker,
    clock: &PositionClock,
    last: &mut Option<(usize, bool)>,
) {
    let index = tracker.advance(lines, clock.current());
    let playing = clock.playing();
    if *last == Some((index, playing)) {
        return;
    }
    *last = Some((index, playing));
    bus.publish(Update {
        lines: Arc::clone(lines),
        index,
        playing,
        err: None,
    });
}
