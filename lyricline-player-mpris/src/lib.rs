//! MPRIS player source.
//!
//! Watches the session bus for an `org.mpris.MediaPlayer2.*` player and
//! translates its properties and signals into [`PlayerEvent`]s. Losing the
//! player is not fatal: the source goes back to discovery and waits for one
//! to reappear.

mod metadata;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lyricline_core::{
    duration_from_micros, CoreError, PlayerEvent, PlayerSource, PositionClock, Track,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zbus::names::OwnedBusName;
use zbus::zvariant::OwnedValue;
use zbus::{fdo, proxy, Connection};

use crate::metadata::track_from_metadata;

/// Bus name prefix shared by all MPRIS players.
const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
/// playerctld follows the most recently active player, so it is preferred
/// over picking an arbitrary one.
const PLAYERCTLD_BUS: &str = "org.mpris.MediaPlayer2.playerctld";
/// Delay between discovery attempts when no player is available.
const RETRY_DELAY: Duration = Duration::from_secs(3);

#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
trait Player {
    /// Playback jumped to a new position.
    #[zbus(signal)]
    fn seeked(&self, position: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    /// Position must be polled: players do not emit property change
    /// notifications for it.
    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> zbus::Result<i64>;
}

/// One observation of the player's state.
#[derive(Debug)]
struct Snapshot {
    track: Option<Track>,
    position: Duration,
    playing: bool,
}

/// MPRIS player watcher implementing [`PlayerSource`].
pub struct MprisSource {
    events: mpsc::Sender<PlayerEvent>,
    poll_interval: Duration,
    seek_threshold: Duration,
    cancel_token: CancellationToken,
}

impl MprisSource {
    /// Create a new MPRIS source
    ///
    /// # Arguments
    /// * `events` - Channel the observed player events are sent into
    /// * `poll_interval_ms` - Polling interval in milliseconds
    /// * `seek_threshold_ms` - Position deviation treated as a seek
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        events: mpsc::Sender<PlayerEvent>,
        poll_interval_ms: u64,
        seek_threshold_ms: u64,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            events,
            poll_interval: Duration::from_millis(poll_interval_ms),
            seek_threshold: Duration::from_millis(seek_threshold_ms),
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Start watching in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("MPRIS source stopped with error: {}", e);
            }
        })
    }

    async fn discover_player(&self, connection: &Connection) -> Result<OwnedBusName, CoreError> {
        let dbus = fdo::DBusProxy::new(connection).await.map_err(bus_error)?;
        let names = dbus.list_names().await.map_err(bus_error)?;
        pick_player(names).ok_or(CoreError::PlayerNotFound)
    }

    /// Watch a single player until it goes away or the source is cancelled.
    async fn watch_player(
        &self,
        connection: &Connection,
        bus_name: OwnedBusName,
        current: &mut Option<Track>,
    ) -> Result<(), CoreError> {
        let player = PlayerProxy::builder(connection)
            .destination(bus_name)
            .map_err(bus_error)?
            .build()
            .await
            .map_err(bus_error)?;

        let mut seeked_signals = player.receive_seeked().await.map_err(bus_error)?;
        let mut clock = PositionClock::new(Duration::ZERO, false, None);

        // Announce whatever is already loaded before the first tick.
        let snapshot = self.observe(&player).await?;
        self.apply_snapshot(snapshot, current, &mut clock).await;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    let snapshot = self.observe(&player).await?;
                    self.apply_snapshot(snapshot, current, &mut clock).await;
                }
                signal = seeked_signals.next() => {
                    let Some(signal) = signal else {
                        return Err(bus_error("seeked signal stream ended"));
                    };
                    let args = signal.args().map_err(bus_error)?;
                    let position = duration_from_micros(args.position);
                    if current.is_some() {
                        debug!("Player seeked to {:?}", position);
                        clock.anchor(position, clock.playing());
                        let _ = self.events.send(PlayerEvent::Seeked { position }).await;
                    }
                }
            }
        }
    }

    /// Read the player's current state off the bus.
    async fn observe(&self, player: &PlayerProxy<'_>) -> Result<Snapshot, CoreError> {
        let status = player.playback_status().await.map_err(bus_error)?;
        let playing = status == "Playing";
        let stopped = status == "Stopped";

        let metadata = player.metadata().await.map_err(bus_error)?;
        let track = track_from_metadata(&metadata);

        // Stopped players report meaningless positions; pin them to zero.
        let position = if stopped {
            Duration::ZERO
        } else {
            duration_from_micros(player.position().await.map_err(bus_error)?)
        };

        Ok(Snapshot {
            track,
            position,
            playing,
        })
    }

    /// Diff a snapshot against the previous one and emit the matching event.
    async fn apply_snapshot(
        &self,
        snapshot: Snapshot,
        current: &mut Option<Track>,
        clock: &mut PositionClock,
    ) {
        match snapshot.track {
            Some(track) => {
                let same_track =
                    matches!(current.as_ref(), Some(c) if c.identity == track.identity);
                if same_track {
                    let event = if clock.deviates(snapshot.position, self.seek_threshold) {
                        debug!("Position deviates from estimate, treating as seek");
                        PlayerEvent::Seeked {
                            position: snapshot.position,
                        }
                    } else {
                        PlayerEvent::Sample {
                            position: snapshot.position,
                            playing: snapshot.playing,
                        }
                    };
                    clock.anchor(snapshot.position, snapshot.playing);
                    // Send failure means the receiving side is shutting down;
                    // the cancellation token ends this loop right after.
                    let _ = self.events.send(event).await;
                } else {
                    info!(
                        "Track changed: {} - {}",
                        track.identity.artist, track.identity.title
                    );
                    clock.reset(snapshot.position, snapshot.playing, track.length);
                    let event = PlayerEvent::TrackChanged {
                        track: track.clone(),
                        position: snapshot.position,
                        playing: snapshot.playing,
                    };
                    *current = Some(track);
                    let _ = self.events.send(event).await;
                }
            }
            None => {
                if current.take().is_some() {
                    info!("Player no longer reports a track");
                    let _ = self.events.send(PlayerEvent::PlayerGone).await;
                }
            }
        }
    }
}

#[async_trait]
impl PlayerSource for MprisSource {
    fn name(&self) -> &'static str {
        "mpris"
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    async fn run(&self) -> Result<(), CoreError> {
        info!("Starting MPRIS player watcher");

        let connection = Connection::session().await.map_err(bus_error)?;

        let mut current: Option<Track> = None;
        let mut waiting_logged = false;

        loop {
            match self.discover_player(&connection).await {
                Ok(bus_name) => {
                    waiting_logged = false;
                    info!("Watching MPRIS player: {}", bus_name);
                    if let Err(e) = self.watch_player(&connection, bus_name, &mut current).await {
                        warn!("Lost MPRIS player: {}", e);
                    }
                }
                Err(CoreError::PlayerNotFound) => {
                    if !waiting_logged {
                        info!("No MPRIS player found, waiting for one to appear");
                        waiting_logged = true;
                    }
                }
                Err(e) => {
                    warn!("MPRIS player discovery failed: {}", e);
                }
            }

            if self.cancel_token.is_cancelled() {
                break;
            }

            // The watched player is gone or none was found.
            if current.take().is_some() {
                let _ = self.events.send(PlayerEvent::PlayerGone).await;
            }

            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                () = tokio::time::sleep(RETRY_DELAY) => {}
            }
        }

        info!("MPRIS player watcher stopped");
        Ok(())
    }
}

fn bus_error(err: impl std::fmt::Display) -> CoreError {
    CoreError::PlayerBusError {
        reason: err.to_string(),
    }
}

fn pick_player(names: Vec<OwnedBusName>) -> Option<OwnedBusName> {
    let mut players: Vec<OwnedBusName> = names
        .into_iter()
        .filter(|name| name.as_str().starts_with(MPRIS_PREFIX))
        .collect();

    if let Some(idx) = players
        .iter()
        .position(|name| name.as_str() == PLAYERCTLD_BUS)
    {
        return Some(players.swap_remove(idx));
    }

    // Sorting keeps the choice stable across discovery rounds.
    players.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    players.into_iter().next()
}
