//! Playback controller - queue and transport state machine
//!
//! Owns the queue, transport state, position, shuffle/loop modes and the
//! sleep timer, and drives a [`PlayerEngine`] through commands. The engine
//! reports back asynchronously through the controller's inbox; every
//! status is tagged with the [`Generation`] of the session that produced
//! it, and anything not from the currently bound session is discarded.
//!
//! Commands and inbox processing all take `&mut self`, so they never
//! interleave. Within a command, the old engine session is always fully
//! unloaded before a new one is opened. A command dropped while its
//! `open` was pending leaves the controller in `Loading` with nothing
//! bound; the next command or inbox message discards that open first.

use crate::{
    engine::{
        EngineStatus, Generation, Inbound, OpenOptions, PlayerEngine, SessionHandle, StatusSink,
        StatusUpdate,
    },
    error::{EngineCommand, EngineError, PlaybackError, Result},
    events::{EventQueue, PlaybackEvent},
    history::History,
    hooks::{NoopHooks, PlaybackHooks},
    queue::Queue,
    sleep_timer::SleepTimer,
    snapshot::{QueueSnapshot, SnapshotStore, SNAPSHOT_VERSION},
    source::MediaSource,
    types::{
        ControllerConfig, LoopMode, PlayableItem, PlaybackPosition, PlaybackView, TransportState,
    },
    volume::Volume,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Playback rate bounds
const MIN_RATE: f32 = 0.25;
const MAX_RATE: f32 = 4.0;

/// The one engine session the controller may hold
#[derive(Debug)]
struct BoundSession {
    handle: SessionHandle,
    generation: Generation,

    /// Engine has reported playing at least once
    started: bool,

    /// Engine loops the resource itself under `RepeatOne`
    engine_looping: bool,
}

/// Unified playback controller for audio and video items
pub struct PlaybackController<E: PlayerEngine> {
    engine: E,
    config: ControllerConfig,
    store: Option<Arc<dyn SnapshotStore>>,
    hooks: Arc<dyn PlaybackHooks>,

    // Session state
    queue: Queue,
    transport: TransportState,
    position: PlaybackPosition,
    loop_mode: LoopMode,
    last_error: Option<PlaybackError>,

    // Engine binding
    session: Option<BoundSession>,
    generation: Generation,

    /// Open issued and not yet resolved; still set here means the command
    /// awaiting it was dropped
    pending_open: Option<Generation>,

    // Settings and side state
    sleep_timer: SleepTimer,
    history: History,
    volume: Volume,
    rate: f32,
    rng: StdRng,

    // Inbox for engine status and timer firings
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    inbox_rx: mpsc::UnboundedReceiver<Inbound>,

    // Observers
    view_tx: watch::Sender<PlaybackView>,
    events: EventQueue,

    last_persisted_position_ms: u64,
}

impl<E: PlayerEngine> PlaybackController<E> {
    /// Create a controller in the `Idle` state
    pub fn new(engine: E, config: ControllerConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(PlaybackView::default());

        let controller = Self {
            engine,
            store: None,
            hooks: Arc::new(NoopHooks),
            queue: Queue::new(),
            transport: TransportState::Idle,
            position: PlaybackPosition::ZERO,
            loop_mode: LoopMode::Off,
            last_error: None,
            session: None,
            generation: Generation::new(0),
            pending_open: None,
            sleep_timer: SleepTimer::new(),
            history: History::new(config.history_size),
            volume: Volume::new(config.volume),
            rate: config.rate.clamp(MIN_RATE, MAX_RATE),
            rng: StdRng::from_entropy(),
            inbox_tx,
            inbox_rx,
            view_tx,
            events: EventQueue::new(config.max_pending_events),
            last_persisted_position_ms: 0,
            config,
        };
        controller.publish();
        controller
    }

    /// Persist snapshots to `store`
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn PlaybackHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Use a deterministic shuffle sequence
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ===== Queue & Transport =====

    /// Replace the queue and start playing `items[start_index]`
    ///
    /// An empty `items` clears the queue and returns to `Idle`.
    pub async fn set_queue(&mut self, items: Vec<PlayableItem>, start_index: usize) -> Result<()> {
        info!(
            "Replacing queue with {} items (start index {})",
            items.len(),
            start_index
        );
        self.reclaim_cancelled_open().await;

        let shuffle = self.queue.is_shuffled();
        self.queue.replace(items, start_index, shuffle, &mut self.rng);
        self.events.push(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });

        let result = if self.queue.is_empty() {
            self.release_session_logged().await;
            self.position = PlaybackPosition::ZERO;
            self.last_error = None;
            self.set_transport(TransportState::Idle);
            Ok(())
        } else {
            self.load_current(0).await
        };

        self.commit().await;
        result
    }

    /// Load items from `source` and start playing `items[start_index]`
    pub async fn load_from_source(
        &mut self,
        source: &dyn MediaSource,
        start_index: usize,
    ) -> Result<()> {
        match source.load_items().await {
            Ok(items) => self.set_queue(items, start_index).await,
            Err(err) => {
                warn!("Media source failed: {}", err);
                let failure = PlaybackError::SourceUnavailable(err.to_string());
                self.record_failure(failure.clone());
                self.publish();
                Err(failure)
            }
        }
    }

    /// Start or resume playback
    ///
    /// Resumes a paused session; otherwise opens the current item (at the
    /// restored or last known position when resuming a paused snapshot or
    /// retrying after an error).
    pub async fn play(&mut self) -> Result<()> {
        self.reclaim_cancelled_open().await;
        if self.queue.is_empty() {
            Self::reject("play with an empty queue");
            return Ok(());
        }

        let result = match self.transport {
            TransportState::Playing | TransportState::Loading => {
                debug!("play ignored, already {:?}", self.transport);
                return Ok(());
            }
            TransportState::Paused if self.session.is_some() => self.resume().await,
            TransportState::Paused | TransportState::Error => {
                let start = self.position.position_ms;
                self.load_current(start).await
            }
            TransportState::Idle | TransportState::Stopped => self.load_current(0).await,
        };

        self.commit().await;
        result
    }

    /// Optimistically switch to `Playing`, roll back if the engine refuses
    async fn resume(&mut self) -> Result<()> {
        let Some(handle) = self.bound_handle() else {
            return Ok(());
        };

        self.set_transport(TransportState::Playing);
        match self.engine.play(&handle).await {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                error!("Engine refused to resume: {}", err);
                self.set_transport(TransportState::Paused);
                Err(self.command_failed(EngineCommand::Play, &err))
            }
        }
    }

    /// Pause playback; no-op unless `Playing`
    pub async fn pause(&mut self) -> Result<()> {
        self.reclaim_cancelled_open().await;
        if self.transport != TransportState::Playing {
            debug!("pause ignored in {:?}", self.transport);
            return Ok(());
        }
        let Some(handle) = self.bound_handle() else {
            return Ok(());
        };

        self.set_transport(TransportState::Paused);
        let result = match self.engine.pause(&handle).await {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                error!("Engine refused to pause: {}", err);
                self.set_transport(TransportState::Playing);
                Err(self.command_failed(EngineCommand::Pause, &err))
            }
        };

        self.commit().await;
        result
    }

    /// End the session: unload the engine, clear the queue, cancel the
    /// sleep timer and return to `Idle`
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping playback session");
        self.reclaim_cancelled_open().await;

        if self.sleep_timer.cancel() {
            self.events
                .push(PlaybackEvent::SleepTimerChanged { fires_at: None });
        }

        let released = self.release_session().await;

        self.queue.clear();
        self.position = PlaybackPosition::ZERO;
        self.events.push(PlaybackEvent::QueueChanged { length: 0 });
        self.set_transport(TransportState::Idle);

        let result = match released {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(failure) => {
                self.record_failure(failure.clone());
                Err(failure)
            }
        };

        self.commit().await;
        result
    }

    /// Advance to the next item in the play order
    ///
    /// At the end of the queue this wraps under `RepeatAll` and otherwise
    /// finishes the queue (`Stopped`, queue retained).
    pub async fn next(&mut self) -> Result<()> {
        self.reclaim_cancelled_open().await;
        if self.queue.is_empty() {
            Self::reject("next with an empty queue");
            return Ok(());
        }

        let result = self.advance().await;
        self.commit().await;
        result
    }

    /// Go back one item; no-op at the start of the play order
    pub async fn previous(&mut self) -> Result<()> {
        self.reclaim_cancelled_open().await;
        if self.queue.is_empty() {
            Self::reject("previous with an empty queue");
            return Ok(());
        }

        let Some(index) = self.queue.previous_index() else {
            debug!("previous ignored, already at the first item");
            return Ok(());
        };

        self.queue.select(index);
        let result = self.load_current(0).await;
        self.commit().await;
        result
    }

    /// Jump to `index` in the play order and start playing it
    pub async fn skip_to(&mut self, index: usize) -> Result<()> {
        self.reclaim_cancelled_open().await;
        if !self.queue.select(index) {
            Self::reject(&format!(
                "skip to index {} in a queue of {}",
                index,
                self.queue.len()
            ));
            return Ok(());
        }

        let result = self.load_current(0).await;
        self.commit().await;
        result
    }

    /// Ask the engine to seek
    ///
    /// The reported position only changes when the engine confirms it
    /// through a status update.
    pub async fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.reclaim_cancelled_open().await;
        let Some(handle) = self.bound_handle() else {
            Self::reject("seek without a loaded item");
            return Ok(());
        };

        let result = match self.engine.seek(&handle, position_ms).await {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                error!("Engine refused to seek to {}ms: {}", position_ms, err);
                Err(self.command_failed(EngineCommand::Seek, &err))
            }
        };

        self.publish();
        result
    }

    // ===== Shuffle & Loop =====

    /// Flip shuffle, keeping the current item current
    pub async fn toggle_shuffle(&mut self) {
        let enabled = !self.queue.is_shuffled();
        self.set_shuffle(enabled).await;
    }

    pub async fn set_shuffle(&mut self, enabled: bool) {
        if self.queue.is_shuffled() == enabled {
            return;
        }

        self.queue.set_shuffle(enabled, &mut self.rng);
        debug!(
            "Shuffle {} (current index {:?})",
            if enabled { "on" } else { "off" },
            self.queue.current_index()
        );
        self.events.push(PlaybackEvent::ShuffleChanged { enabled });
        self.commit().await;
    }

    /// Takes effect on the next natural end of an item
    pub async fn set_loop_mode(&mut self, mode: LoopMode) {
        if self.loop_mode == mode {
            return;
        }

        let previous = self.loop_mode;
        self.loop_mode = mode;
        if previous == LoopMode::RepeatOne || mode == LoopMode::RepeatOne {
            self.sync_engine_looping().await;
        }
        self.events.push(PlaybackEvent::LoopModeChanged { mode });
        self.commit().await;
    }

    // ===== Sleep Timer =====

    /// Stop playback after `after`, replacing any active timer
    ///
    /// Delays beyond 30 years are clamped. Must be called from within a
    /// tokio runtime.
    pub fn set_sleep_timer(&mut self, after: Duration) {
        if after.is_zero() {
            Self::reject("sleep timer with zero duration");
            return;
        }

        let fires_at = self.sleep_timer.schedule(after, self.inbox_tx.clone());
        info!("Sleep timer set for {:?} (fires at {})", after, fires_at);
        self.events.push(PlaybackEvent::SleepTimerChanged {
            fires_at: Some(fires_at),
        });
        self.publish();
    }

    /// Cancel the sleep timer; no-op if none is active
    pub fn clear_sleep_timer(&mut self) {
        if self.sleep_timer.cancel() {
            self.events
                .push(PlaybackEvent::SleepTimerChanged { fires_at: None });
            self.publish();
        }
    }

    pub fn sleep_timer_fires_at(&self) -> Option<DateTime<Utc>> {
        self.sleep_timer.fires_at()
    }

    pub fn sleep_timer_remaining(&self) -> Option<Duration> {
        self.sleep_timer.remaining()
    }

    // ===== Volume & Rate =====

    /// Set volume (0-100)
    pub async fn set_volume(&mut self, level: u8) -> Result<()> {
        let previous = self.volume;
        self.volume.set_level(level);
        self.apply_volume(previous).await
    }

    pub async fn mute(&mut self) -> Result<()> {
        self.set_muted(true).await
    }

    pub async fn unmute(&mut self) -> Result<()> {
        self.set_muted(false).await
    }

    pub async fn toggle_mute(&mut self) -> Result<()> {
        let muted = !self.volume.is_muted();
        self.set_muted(muted).await
    }

    async fn set_muted(&mut self, muted: bool) -> Result<()> {
        let previous = self.volume;
        self.volume.set_muted(muted);
        self.apply_volume(previous).await
    }

    async fn apply_volume(&mut self, previous: Volume) -> Result<()> {
        if self.volume == previous {
            return Ok(());
        }

        if let Some(handle) = self.bound_handle() {
            match self.engine.set_volume(&handle, self.volume.gain()).await {
                Ok(()) => {}
                Err(EngineError::Unsupported) => {
                    debug!("Engine has no volume control");
                }
                Err(err) => {
                    error!("Engine refused volume change: {}", err);
                    self.volume = previous;
                    let failure = self.command_failed(EngineCommand::SetVolume, &err);
                    self.publish();
                    return Err(failure);
                }
            }
        }

        self.events.push(PlaybackEvent::VolumeChanged {
            level: self.volume.level(),
            is_muted: self.volume.is_muted(),
        });
        self.publish();
        Ok(())
    }

    /// Set playback rate, clamped to 0.25-4.0
    pub async fn set_rate(&mut self, rate: f32) -> Result<()> {
        let rate = rate.clamp(MIN_RATE, MAX_RATE);
        if rate == self.rate {
            return Ok(());
        }

        if let Some(handle) = self.bound_handle() {
            match self.engine.set_rate(&handle, rate).await {
                Ok(()) => {}
                Err(EngineError::Unsupported) => {
                    debug!("Engine has no rate control, applied on next open");
                }
                Err(err) => {
                    error!("Engine refused rate {}: {}", rate, err);
                    let failure = self.command_failed(EngineCommand::SetRate, &err);
                    self.publish();
                    return Err(failure);
                }
            }
        }

        self.rate = rate;
        self.events.push(PlaybackEvent::RateChanged { rate });
        self.publish();
        Ok(())
    }

    // ===== Inbox =====

    /// Handle every queued engine status and timer firing without waiting
    ///
    /// Returns the number of messages handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.inbox_rx.try_recv() {
            self.handle_inbound(message).await;
            handled += 1;
        }
        handled
    }

    /// Wait for the next engine status or timer firing and handle it
    pub async fn wait_and_process(&mut self) {
        // The controller holds a sender, so the inbox never closes
        if let Some(message) = self.inbox_rx.recv().await {
            self.handle_inbound(message).await;
        }
    }

    async fn handle_inbound(&mut self, message: Inbound) {
        self.reclaim_cancelled_open().await;
        match message {
            Inbound::Status { generation, status } => {
                self.handle_status(generation, status).await;
            }
            Inbound::SleepTimerFired { timer_id } => {
                if !self.sleep_timer.take_fired(timer_id) {
                    debug!("Ignoring stale sleep timer {}", timer_id);
                    return;
                }

                info!("Sleep timer expired, stopping playback");
                self.events.push(PlaybackEvent::SleepTimerFired);
                self.events
                    .push(PlaybackEvent::SleepTimerChanged { fires_at: None });
                if let Err(err) = self.stop().await {
                    warn!("Stop after sleep timer reported: {}", err);
                }
            }
        }
    }

    async fn handle_status(&mut self, generation: Generation, status: EngineStatus) {
        let is_current = self
            .session
            .as_ref()
            .is_some_and(|session| session.generation == generation);
        if !is_current {
            debug!("Discarding status from stale session {}", generation);
            return;
        }

        match status {
            EngineStatus::Update(update) => self.apply_update(update).await,
            EngineStatus::Error { reason } => {
                let item_id = self
                    .queue
                    .current()
                    .map(|item| item.id.clone())
                    .unwrap_or_default();
                error!("Engine error for {}: {}", item_id, reason);

                let failure = if self.transport == TransportState::Loading {
                    PlaybackError::EngineOpenFailed { item_id, reason }
                } else {
                    PlaybackError::PlaybackFailed { item_id, reason }
                };
                self.fail(failure);
                self.commit().await;
            }
        }
    }

    /// Mirror engine-reported state; the engine is authoritative here
    async fn apply_update(&mut self, update: StatusUpdate) {
        self.position = PlaybackPosition {
            position_ms: update.position_ms,
            duration_ms: update.duration_ms,
        };
        self.events.push(PlaybackEvent::PositionUpdate {
            position_ms: update.position_ms,
            duration_ms: update.duration_ms,
        });

        if update.did_just_finish {
            self.handle_item_finished().await;
            self.commit().await;
            return;
        }

        if self.transport != TransportState::Error {
            if update.is_playing {
                self.mark_started();
                self.set_transport(TransportState::Playing);
            } else if !update.is_buffering
                && matches!(
                    self.transport,
                    TransportState::Playing | TransportState::Loading
                )
            {
                self.set_transport(TransportState::Paused);
            }
        }

        let moved = update
            .position_ms
            .abs_diff(self.last_persisted_position_ms);
        if moved >= self.config.position_persist_interval_ms {
            self.persist().await;
        }
        self.publish();
    }

    /// Record the first playback of the bound session
    fn mark_started(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.started {
            return;
        }
        session.started = true;

        if let Some(item) = self.queue.current() {
            debug!("Playback started for {}", item.id);
            self.history.record(item);
            self.hooks.playback_started(item);
        }
    }

    async fn handle_item_finished(&mut self) {
        if let Some(item) = self.queue.current() {
            debug!("Item {} finished (loop {:?})", item.id, self.loop_mode);
        }

        if self.loop_mode == LoopMode::RepeatOne {
            let engine_looping = self
                .session
                .as_ref()
                .is_some_and(|session| session.engine_looping);
            if engine_looping {
                debug!("Engine wrapped the item itself");
                return;
            }
            if let Some(handle) = self.bound_handle() {
                self.replay(&handle).await;
                return;
            }
        }

        if let Err(err) = self.advance().await {
            warn!("Auto-advance failed: {}", err);
        }
    }

    /// Seek the bound session back to zero and play it again
    async fn replay(&mut self, handle: &SessionHandle) {
        let replayed = match self.engine.seek(handle, 0).await {
            Ok(()) => self
                .engine
                .play(handle)
                .await
                .map_err(|err| (EngineCommand::Play, err)),
            Err(err) => Err((EngineCommand::Seek, err)),
        };

        match replayed {
            Ok(()) => self.set_transport(TransportState::Playing),
            Err((command, err)) => {
                error!("Replay failed on {}: {}", command, err);
                self.set_transport(TransportState::Paused);
                self.command_failed(command, &err);
            }
        }
    }

    /// Move to the next index, or finish the queue
    async fn advance(&mut self) -> Result<()> {
        match self.next_position() {
            Ok(index) => {
                self.queue.select(index);
                self.load_current(0).await
            }
            Err(PlaybackError::QueueExhausted) => {
                self.finish_queue().await;
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn next_position(&self) -> Result<usize> {
        self.queue
            .next_index(self.loop_mode == LoopMode::RepeatAll)
            .ok_or(PlaybackError::QueueExhausted)
    }

    /// Terminal state after the last item: engine released, queue kept
    async fn finish_queue(&mut self) {
        info!("Reached end of queue");
        self.release_session_logged().await;
        self.position = PlaybackPosition::ZERO;
        self.set_transport(TransportState::Stopped);
        self.events.push(PlaybackEvent::QueueFinished);
    }

    // ===== Engine Session =====

    /// Unload the bound session (if any) and open the current item
    async fn load_current(&mut self, start_position_ms: u64) -> Result<()> {
        self.release_session_logged().await;

        let Some(item) = self.queue.current().cloned() else {
            self.set_transport(TransportState::Idle);
            return Ok(());
        };
        let index = self.queue.current_index().unwrap_or_default();

        self.generation = self.generation.next();
        let generation = self.generation;

        self.position = PlaybackPosition {
            position_ms: start_position_ms,
            duration_ms: item
                .duration_hint
                .map_or(0, |duration| duration.as_millis() as u64),
        };
        self.last_persisted_position_ms = start_position_ms;
        self.set_transport(TransportState::Loading);
        self.events.push(PlaybackEvent::ItemChanged {
            item_id: item.id.clone(),
            index,
        });
        self.hooks.item_loaded(&item);

        let options = OpenOptions {
            autoplay: true,
            start_position_ms,
            looping: false,
            rate: self.rate,
            volume: self.volume.gain(),
        };
        let sink = StatusSink::new(generation, self.inbox_tx.clone());

        debug!("Opening {} as {} ({})", item.id, generation, item.uri);
        self.pending_open = Some(generation);
        let opened = self.engine.open(&item.uri, options, sink).await;
        self.pending_open = None;

        match opened {
            Ok(handle) => {
                self.session = Some(BoundSession {
                    handle,
                    generation,
                    started: false,
                    engine_looping: false,
                });
                self.last_error = None;
                if self.loop_mode == LoopMode::RepeatOne {
                    self.sync_engine_looping().await;
                }
                Ok(())
            }
            Err(err) => {
                error!("Failed to open {} ({}): {}", item.id, item.uri, err);
                let failure = PlaybackError::open_failed(&item.id, &err);
                self.fail(failure.clone());
                Err(failure)
            }
        }
    }

    /// Stop and unload the bound session
    ///
    /// Unload is attempted even if stop fails; the first failure is
    /// returned. The session is forgotten once unload has been awaited, so
    /// a release cut short is retried by the next one.
    async fn release_session(&mut self) -> Result<()> {
        let Some((handle, generation)) = self
            .session
            .as_ref()
            .map(|session| (session.handle.clone(), session.generation))
        else {
            return Ok(());
        };
        debug!("Releasing engine session {}", generation);

        let stopped = match self.engine.stop(&handle).await {
            Ok(()) | Err(EngineError::SessionReleased) => Ok(()),
            Err(err) => Err(PlaybackError::command_failed(EngineCommand::Stop, &err)),
        };
        let unloaded = match self.engine.unload(handle).await {
            Ok(()) | Err(EngineError::SessionReleased) => Ok(()),
            Err(err) => Err(PlaybackError::command_failed(EngineCommand::Unload, &err)),
        };
        self.session = None;
        stopped.and(unloaded)
    }

    /// Discard an `open` whose command was dropped before it resolved
    ///
    /// The item stays selected and transport drops from `Loading` to
    /// `Paused`, so `play()` reopens it at the requested position.
    async fn reclaim_cancelled_open(&mut self) {
        let Some(generation) = self.pending_open else {
            return;
        };
        warn!("Open for {} was cancelled, discarding it", generation);

        match self.engine.discard_open(generation).await {
            Ok(()) | Err(EngineError::SessionReleased) => {}
            Err(err) => {
                warn!(
                    "Cancelled open {} did not release cleanly: {}",
                    generation, err
                );
            }
        }
        self.pending_open = None;

        if self.transport == TransportState::Loading && self.session.is_none() {
            self.set_transport(TransportState::Paused);
            self.publish();
        }
    }

    /// Hand `RepeatOne` to the engine when it can loop natively
    ///
    /// Engines without the capability are looped by replaying on each
    /// natural end.
    async fn sync_engine_looping(&mut self) {
        let Some(handle) = self.bound_handle() else {
            return;
        };
        let looping = self.loop_mode == LoopMode::RepeatOne;

        let applied = match self.engine.set_looping(&handle, looping).await {
            Ok(()) => looping,
            Err(EngineError::Unsupported) => false,
            Err(err) => {
                warn!("Engine refused looping={}: {}", looping, err);
                self.command_failed(EngineCommand::SetLooping, &err);
                false
            }
        };
        if let Some(session) = self.session.as_mut() {
            session.engine_looping = applied;
        }
    }

    async fn release_session_logged(&mut self) {
        if let Err(err) = self.release_session().await {
            warn!("Previous engine session did not release cleanly: {}", err);
        }
    }

    fn bound_handle(&self) -> Option<SessionHandle> {
        self.session.as_ref().map(|session| session.handle.clone())
    }

    // ===== Persistence =====

    /// Restore the last persisted session
    ///
    /// Intended to run once after construction. The restored transport is
    /// `Paused` (or `Idle` for an empty queue), never `Playing`. Returns
    /// whether a non-empty queue was restored.
    pub async fn restore(&mut self) -> Result<bool> {
        let Some(store) = self.store.clone() else {
            return Ok(false);
        };
        if self.session.is_some() {
            Self::reject("restore while an item is loaded");
            return Ok(false);
        }

        let Some(blob) = store.get(&self.config.snapshot_key).await? else {
            debug!("No playback snapshot under {}", self.config.snapshot_key);
            return Ok(false);
        };
        let snapshot = QueueSnapshot::decode(&blob).map_err(|err| {
            warn!("Discarding unreadable playback snapshot: {}", err);
            PlaybackError::from(err)
        })?;

        if snapshot.was_playing {
            info!("Restored session was playing; waiting for an explicit play()");
        }

        self.queue.restore(
            snapshot.items,
            &snapshot.play_order,
            snapshot.current_index,
            snapshot.shuffle,
            &mut self.rng,
        );
        self.loop_mode = snapshot.loop_mode;
        self.last_persisted_position_ms = snapshot.position_ms;
        self.events.push(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });

        let restored = match self.queue.current() {
            Some(item) => {
                self.position = PlaybackPosition {
                    position_ms: snapshot.position_ms,
                    duration_ms: item
                        .duration_hint
                        .map_or(0, |duration| duration.as_millis() as u64),
                };
                self.set_transport(TransportState::Paused);
                true
            }
            None => {
                self.position = PlaybackPosition::ZERO;
                self.set_transport(TransportState::Idle);
                false
            }
        };

        info!(
            "Restored {} queued items at index {:?}",
            self.queue.len(),
            self.queue.current_index()
        );
        self.publish();
        Ok(restored)
    }

    /// Current session as a persistable snapshot
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            version: SNAPSHOT_VERSION,
            items: self.queue.original_order().to_vec(),
            play_order: self.queue.play_order_ids(),
            current_index: self.queue.current_index(),
            shuffle: self.queue.is_shuffled(),
            loop_mode: self.loop_mode,
            position_ms: self.position.position_ms,
            was_playing: matches!(
                self.transport,
                TransportState::Playing | TransportState::Loading
            ),
        }
    }

    async fn persist(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        self.last_persisted_position_ms = self.position.position_ms;

        let written = match self.snapshot().encode() {
            Ok(blob) => store.set(&self.config.snapshot_key, blob).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            warn!("Failed to persist playback snapshot: {}", err);
        }
    }

    async fn commit(&mut self) {
        self.persist().await;
        self.publish();
    }

    // ===== State Transitions =====

    fn set_transport(&mut self, state: TransportState) {
        if self.transport == state {
            return;
        }
        debug!("Transport {:?} -> {:?}", self.transport, state);
        self.events.push(PlaybackEvent::StateChanged {
            from: self.transport,
            to: state,
        });
        self.transport = state;
    }

    /// Record a failure as `last_error` without changing transport state
    fn record_failure(&mut self, failure: PlaybackError) {
        self.events.push(PlaybackEvent::Error {
            error: failure.clone(),
        });
        self.last_error = Some(failure);
    }

    /// Record a failure and enter `Error`
    fn fail(&mut self, failure: PlaybackError) {
        self.record_failure(failure);
        self.set_transport(TransportState::Error);
    }

    fn command_failed(&mut self, command: EngineCommand, err: &EngineError) -> PlaybackError {
        let failure = PlaybackError::command_failed(command, err);
        self.record_failure(failure.clone());
        failure
    }

    fn reject(operation: &str) {
        let err = PlaybackError::InvalidOperation(operation.to_string());
        warn!("Ignoring command: {}", err);
    }

    // ===== State Queries =====

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn current_item(&self) -> Option<&PlayableItem> {
        self.queue.current()
    }

    /// Index of the current item in the play order
    pub fn current_index(&self) -> Option<usize> {
        self.queue.current_index()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Items in caller-provided order
    pub fn original_order(&self) -> &[PlayableItem] {
        self.queue.original_order()
    }

    /// Items in traversal order
    pub fn play_order(&self) -> Vec<&PlayableItem> {
        self.queue.play_order()
    }

    pub fn position(&self) -> PlaybackPosition {
        self.position
    }

    pub fn is_shuffle_on(&self) -> bool {
        self.queue.is_shuffled()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    /// Generation of the bound engine session
    pub fn current_generation(&self) -> Option<Generation> {
        self.session.as_ref().map(|session| session.generation)
    }

    /// Recently played items, most recent first
    pub fn recently_played(&self) -> Vec<&PlayableItem> {
        self.history.recent()
    }

    pub fn volume(&self) -> u8 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ===== Observers =====

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackView> {
        self.view_tx.subscribe()
    }

    /// Current observable state
    pub fn view(&self) -> PlaybackView {
        PlaybackView {
            current_item: self.queue.current().cloned(),
            current_index: self.queue.current_index(),
            queue_len: self.queue.len(),
            transport: self.transport,
            position: self.position,
            shuffle: self.queue.is_shuffled(),
            loop_mode: self.loop_mode,
            sleep_timer_fires_at: self.sleep_timer.fires_at(),
            last_error: self.last_error.clone(),
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            rate: self.rate,
        }
    }

    /// Drain discrete events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn publish(&self) {
        let view = self.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
