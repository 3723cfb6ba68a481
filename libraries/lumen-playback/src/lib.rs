//! Lumen - Playback Queue Control
//!
//! Platform-agnostic queue and transport control for audio and video.
//!
//! This crate provides:
//! - Ordered play queue with shuffle that keeps the current item current
//! - Loop modes (Off, RepeatOne, RepeatAll)
//! - Transport state machine driven by asynchronous engine status
//! - Sleep timer
//! - Resume snapshots through a pluggable key-value store
//! - Recently played history, volume, mute and playback rate
//!
//! # Architecture
//!
//! `lumen-playback` never decodes or renders media. A platform supplies a
//! [`PlayerEngine`] (the native SDK wrapper) and optionally a
//! [`SnapshotStore`] and [`MediaSource`]. The [`PlaybackController`] binds
//! at most one engine session at a time and tags every session with a
//! [`Generation`]; status reported by an engine session that has since
//! been unloaded is discarded.
//!
//! Engine status and sleep timer firings arrive through the controller's
//! inbox and are handled by [`PlaybackController::process_pending`] or
//! [`PlaybackController::wait_and_process`].
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lumen_playback::{
//!     ControllerConfig, EngineError, OpenOptions, PlayableItem, PlaybackController,
//!     PlayerEngine, SessionHandle, StatusSink,
//! };
//!
//! struct NativePlayer;
//!
//! #[async_trait]
//! impl PlayerEngine for NativePlayer {
//!     async fn open(
//!         &mut self,
//!         uri: &str,
//!         _options: OpenOptions,
//!         _status: StatusSink,
//!     ) -> Result<SessionHandle, EngineError> {
//!         // Hand the uri to the platform player, keep the sink for callbacks
//!         Ok(SessionHandle::new(uri))
//!     }
//!
//!     async fn play(&mut self, _: &SessionHandle) -> Result<(), EngineError> { Ok(()) }
//!     async fn pause(&mut self, _: &SessionHandle) -> Result<(), EngineError> { Ok(()) }
//!     async fn stop(&mut self, _: &SessionHandle) -> Result<(), EngineError> { Ok(()) }
//!     async fn unload(&mut self, _: SessionHandle) -> Result<(), EngineError> { Ok(()) }
//!     async fn seek(&mut self, _: &SessionHandle, _: u64) -> Result<(), EngineError> { Ok(()) }
//! }
//!
//! # async fn run() -> lumen_playback::Result<()> {
//! let mut controller = PlaybackController::new(NativePlayer, ControllerConfig::default());
//!
//! controller
//!     .set_queue(
//!         vec![
//!             PlayableItem::new("a", "file:///music/a.mp3", "First"),
//!             PlayableItem::new("b", "file:///music/b.mp3", "Second"),
//!         ],
//!         0,
//!     )
//!     .await?;
//!
//! controller.toggle_shuffle().await;
//!
//! loop {
//!     controller.wait_and_process().await;
//!     for event in controller.drain_events() {
//!         println!("{:?}", event);
//!     }
//! }
//! # }
//! ```

mod controller;
mod engine;
mod error;
mod events;
mod history;
mod hooks;
mod queue;
mod shuffle;
mod sleep_timer;
mod snapshot;
mod source;
pub mod types;
mod volume;

// Public exports
pub use controller::PlaybackController;
pub use engine::{
    EngineStatus, Generation, OpenOptions, PlayerEngine, SessionHandle, StatusSink, StatusUpdate,
};
pub use error::{EngineCommand, EngineError, PlaybackError, Result, SnapshotError};
pub use events::PlaybackEvent;
pub use history::History;
pub use hooks::{NoopHooks, PlaybackHooks};
pub use queue::Queue;
pub use shuffle::{build_shuffled_order, build_shuffled_order_with};
pub use snapshot::{MemorySnapshotStore, QueueSnapshot, SnapshotStore, SNAPSHOT_VERSION};
pub use source::{MediaSource, SourceError, StaticSource};
pub use types::{
    ControllerConfig, LoopMode, MediaKind, PlayableItem, PlaybackPosition, PlaybackView,
    TransportState,
};
pub use volume::Volume;
