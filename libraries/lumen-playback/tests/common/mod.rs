//! Shared test infrastructure: a scripted engine and item helpers

#![allow(dead_code)]

use async_trait::async_trait;
use lumen_playback::{
    ControllerConfig, EngineError, Generation, OpenOptions, PlayableItem, PlaybackController,
    PlayerEngine, SessionHandle, StatusSink, StatusUpdate,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Engine call as observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(String),
    Play(String),
    Pause(String),
    Stop(String),
    Unload(String),
    Discard(Generation),
    Seek(String, u64),
    SetLooping(String, bool),
    SetRate(String, f32),
    SetVolume(String, f32),
}

#[derive(Default)]
pub struct EngineState {
    pub calls: Vec<Call>,
    pub sinks: Vec<StatusSink>,
    pub options: Vec<OpenOptions>,

    /// Sessions opened and not yet unloaded
    pub live: HashSet<String>,
    pub max_live: usize,

    /// Session id created for each generation
    pub generations: HashMap<Generation, String>,

    /// `open` suspends this long after creating the session
    pub open_delay: Option<Duration>,

    /// Engine loops natively instead of returning `Unsupported`
    pub supports_looping: bool,

    // Failure injection
    pub fail_open: HashSet<String>,
    pub fail_play: bool,
    pub fail_pause: bool,
    pub fail_seek: bool,
    pub fail_volume: bool,

    next_id: u32,
}

/// Scripted engine; clones share state so tests can keep an observer
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }

    /// Sink handed to the most recent `open`
    pub fn last_sink(&self) -> StatusSink {
        self.state().sinks.last().cloned().expect("nothing opened")
    }

    pub fn sink(&self, n: usize) -> StatusSink {
        self.state().sinks[n].clone()
    }

    pub fn last_options(&self) -> OpenOptions {
        self.state().options.last().cloned().expect("nothing opened")
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn opened_uris(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Open(uri) => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn live_sessions(&self) -> usize {
        self.state().live.len()
    }

    pub fn max_live_sessions(&self) -> usize {
        self.state().max_live
    }

    pub fn fail_open(&self, uri: &str) {
        self.state().fail_open.insert(uri.to_string());
    }

    fn check(&self, session: &SessionHandle) -> Result<(), EngineError> {
        if self.state().live.contains(session.id()) {
            Ok(())
        } else {
            Err(EngineError::SessionReleased)
        }
    }
}

#[async_trait]
impl PlayerEngine for MockEngine {
    async fn open(
        &mut self,
        uri: &str,
        options: OpenOptions,
        status: StatusSink,
    ) -> Result<SessionHandle, EngineError> {
        let (handle, delay) = {
            let mut state = self.state();
            state.calls.push(Call::Open(uri.to_string()));
            if state.fail_open.contains(uri) {
                return Err(EngineError::OpenFailed(format!("cannot open {}", uri)));
            }

            state.next_id += 1;
            let id = format!("session-{}", state.next_id);
            state.live.insert(id.clone());
            let live = state.live.len();
            state.max_live = state.max_live.max(live);
            state.generations.insert(status.generation(), id.clone());
            state.sinks.push(status);
            state.options.push(options);
            (SessionHandle::new(id), state.open_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(handle)
    }

    async fn play(&mut self, session: &SessionHandle) -> Result<(), EngineError> {
        self.check(session)?;
        let mut state = self.state();
        state.calls.push(Call::Play(session.id().to_string()));
        if state.fail_play {
            return Err(EngineError::CommandFailed("play refused".to_string()));
        }
        Ok(())
    }

    async fn pause(&mut self, session: &SessionHandle) -> Result<(), EngineError> {
        self.check(session)?;
        let mut state = self.state();
        state.calls.push(Call::Pause(session.id().to_string()));
        if state.fail_pause {
            return Err(EngineError::CommandFailed("pause refused".to_string()));
        }
        Ok(())
    }

    async fn stop(&mut self, session: &SessionHandle) -> Result<(), EngineError> {
        self.check(session)?;
        self.state().calls.push(Call::Stop(session.id().to_string()));
        Ok(())
    }

    async fn unload(&mut self, session: SessionHandle) -> Result<(), EngineError> {
        let mut state = self.state();
        state.calls.push(Call::Unload(session.id().to_string()));
        if state.live.remove(session.id()) {
            Ok(())
        } else {
            Err(EngineError::SessionReleased)
        }
    }

    async fn discard_open(&mut self, generation: Generation) -> Result<(), EngineError> {
        let mut state = self.state();
        state.calls.push(Call::Discard(generation));
        let id = state.generations.get(&generation).cloned();
        match id {
            Some(id) if state.live.remove(&id) => Ok(()),
            _ => Err(EngineError::SessionReleased),
        }
    }

    async fn seek(&mut self, session: &SessionHandle, position_ms: u64) -> Result<(), EngineError> {
        self.check(session)?;
        let mut state = self.state();
        state
            .calls
            .push(Call::Seek(session.id().to_string(), position_ms));
        if state.fail_seek {
            return Err(EngineError::CommandFailed("seek refused".to_string()));
        }
        Ok(())
    }

    async fn set_rate(&mut self, session: &SessionHandle, rate: f32) -> Result<(), EngineError> {
        self.check(session)?;
        self.state()
            .calls
            .push(Call::SetRate(session.id().to_string(), rate));
        Ok(())
    }

    async fn set_looping(
        &mut self,
        session: &SessionHandle,
        looping: bool,
    ) -> Result<(), EngineError> {
        self.check(session)?;
        let mut state = self.state();
        if !state.supports_looping {
            return Err(EngineError::Unsupported);
        }
        state
            .calls
            .push(Call::SetLooping(session.id().to_string(), looping));
        Ok(())
    }

    async fn set_volume(&mut self, session: &SessionHandle, gain: f32) -> Result<(), EngineError> {
        self.check(session)?;
        let mut state = self.state();
        state
            .calls
            .push(Call::SetVolume(session.id().to_string(), gain));
        if state.fail_volume {
            return Err(EngineError::CommandFailed("volume refused".to_string()));
        }
        Ok(())
    }
}

// ===== Helpers =====

pub fn create_test_item(id: &str) -> PlayableItem {
    PlayableItem::new(id, uri(id), format!("Track {}", id))
        .with_artist("Test Artist")
        .with_duration_hint(Duration::from_secs(180))
}

pub fn create_test_items(ids: &[&str]) -> Vec<PlayableItem> {
    ids.iter().map(|id| create_test_item(id)).collect()
}

pub fn uri(id: &str) -> String {
    format!("file:///music/{}.mp3", id)
}

/// Controller plus an engine clone sharing the engine's state
pub fn create_controller() -> (PlaybackController<MockEngine>, MockEngine) {
    create_controller_with(ControllerConfig::default())
}

pub fn create_controller_with(
    config: ControllerConfig,
) -> (PlaybackController<MockEngine>, MockEngine) {
    let engine = MockEngine::new();
    let observer = engine.clone();
    let controller = PlaybackController::new(engine, config).with_shuffle_seed(7);
    (controller, observer)
}

pub fn playing_at(position_ms: u64) -> StatusUpdate {
    StatusUpdate {
        position_ms,
        duration_ms: 180_000,
        is_playing: true,
        ..Default::default()
    }
}

pub fn paused_at(position_ms: u64) -> StatusUpdate {
    StatusUpdate {
        position_ms,
        duration_ms: 180_000,
        ..Default::default()
    }
}

pub fn finished() -> StatusUpdate {
    StatusUpdate {
        position_ms: 180_000,
        duration_ms: 180_000,
        did_just_finish: true,
        ..Default::default()
    }
}

/// Report "playing" from the latest session and let the controller see it
pub async fn confirm_playing(
    controller: &mut PlaybackController<MockEngine>,
    engine: &MockEngine,
) {
    engine.last_sink().update(playing_at(0));
    controller.process_pending().await;
}

/// Report natural end from the latest session and let the controller see it
pub async fn finish_current(controller: &mut PlaybackController<MockEngine>, engine: &MockEngine) {
    engine.last_sink().update(finished());
    controller.process_pending().await;
}
