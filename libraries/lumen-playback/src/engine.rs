//! Player engine boundary
//!
//! Abstracts the platform playback SDK (audio or video) that actually
//! decodes and renders. The controller is the only caller of these methods
//! and binds at most one session at a time.

use crate::error::EngineError;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// Identifies one engine session
///
/// Strictly increasing per controller. Status events carry the generation
/// of the session that produced them, so events from an unloaded session
/// can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Opaque handle to a loaded resource, issued by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Options for [`PlayerEngine::open`]
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOptions {
    /// Start playing as soon as the resource is ready
    pub autoplay: bool,

    /// Initial position
    pub start_position_ms: u64,

    /// Engine-level looping of the single resource
    pub looping: bool,

    /// Playback rate (1.0 = normal)
    pub rate: f32,

    /// Linear gain (0.0-1.0)
    pub volume: f32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            start_position_ms: 0,
            looping: false,
            rate: 1.0,
            volume: 1.0,
        }
    }
}

/// Periodic status reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusUpdate {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub is_buffering: bool,

    /// Natural end of the current resource
    pub did_just_finish: bool,
}

/// Everything an engine can report asynchronously
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Update(StatusUpdate),
    Error { reason: String },
}

/// Message delivered to the controller's inbox
#[derive(Debug)]
pub(crate) enum Inbound {
    Status {
        generation: Generation,
        status: EngineStatus,
    },
    SleepTimerFired {
        timer_id: u64,
    },
}

/// Status callback handed to the engine on `open`
///
/// Every status sent through a sink is tagged with the generation of the
/// session it was created for.
#[derive(Debug, Clone)]
pub struct StatusSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl StatusSink {
    pub(crate) fn new(generation: Generation, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Deliver a status to the controller
    ///
    /// Returns false once the controller has been dropped.
    pub fn send(&self, status: EngineStatus) -> bool {
        self.tx
            .send(Inbound::Status {
                generation: self.generation,
                status,
            })
            .is_ok()
    }

    pub fn update(&self, update: StatusUpdate) -> bool {
        self.send(EngineStatus::Update(update))
    }

    pub fn error(&self, reason: impl Into<String>) -> bool {
        self.send(EngineStatus::Error {
            reason: reason.into(),
        })
    }
}

/// Platform playback engine
///
/// Implementors wrap a platform SDK. All methods may suspend; the
/// controller awaits each call before issuing the next, and always awaits
/// `unload` of the old session before `open` of a new one. A controller
/// future dropped mid-`open` is followed by `discard_open` before any
/// other session is opened.
#[async_trait]
pub trait PlayerEngine: Send {
    /// Open `uri` and start reporting status through `status`
    async fn open(
        &mut self,
        uri: &str,
        options: OpenOptions,
        status: StatusSink,
    ) -> Result<SessionHandle, EngineError>;

    /// Start or resume playback
    async fn play(&mut self, session: &SessionHandle) -> Result<(), EngineError>;

    async fn pause(&mut self, session: &SessionHandle) -> Result<(), EngineError>;

    /// Halt playback without releasing the resource
    async fn stop(&mut self, session: &SessionHandle) -> Result<(), EngineError>;

    /// Release the resource; the handle is dead afterwards
    async fn unload(&mut self, session: SessionHandle) -> Result<(), EngineError>;

    /// Release whatever `open` created for `generation` after its future
    /// was dropped before returning a handle
    ///
    /// Engines that register nothing until `open` returns can keep the
    /// default.
    async fn discard_open(&mut self, generation: Generation) -> Result<(), EngineError> {
        let _ = generation;
        Ok(())
    }

    async fn seek(&mut self, session: &SessionHandle, position_ms: u64) -> Result<(), EngineError>;

    /// Optional capability
    async fn set_rate(&mut self, session: &SessionHandle, rate: f32) -> Result<(), EngineError> {
        let _ = (session, rate);
        Err(EngineError::Unsupported)
    }

    /// Optional capability
    async fn set_looping(
        &mut self,
        session: &SessionHandle,
        looping: bool,
    ) -> Result<(), EngineError> {
        let _ = (session, looping);
        Err(EngineError::Unsupported)
    }

    /// Optional capability; `gain` is linear 0.0-1.0
    async fn set_volume(&mut self, session: &SessionHandle, gain: f32) -> Result<(), EngineError> {
        let _ = (session, gain);
        Err(EngineError::Unsupported)
    }
}
