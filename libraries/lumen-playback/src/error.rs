//! Error types for playback control

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Engine command that can fail while a session is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    Play,
    Pause,
    Stop,
    Unload,
    Seek,
    SetRate,
    SetVolume,
    SetLooping,
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Unload => "unload",
            Self::Seek => "seek",
            Self::SetRate => "set_rate",
            Self::SetVolume => "set_volume",
            Self::SetLooping => "set_looping",
        };
        f.write_str(name)
    }
}

/// Playback errors
///
/// Stored as the controller's `last_error` and published to observers,
/// so every variant carries owned, cloneable context.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlaybackError {
    /// Engine could not open/load a resource
    #[error("Failed to open item {item_id}: {reason}")]
    EngineOpenFailed { item_id: String, reason: String },

    /// Engine rejected a command while a session was bound
    #[error("Engine rejected {command}: {reason}")]
    EngineCommandFailed {
        command: EngineCommand,
        reason: String,
    },

    /// Engine reported an error for the bound session
    #[error("Playback of item {item_id} failed: {reason}")]
    PlaybackFailed { item_id: String, reason: String },

    /// End of queue reached with looping off
    #[error("Queue exhausted")]
    QueueExhausted,

    /// Command violated a precondition
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Media source could not produce items
    #[error("Media source unavailable: {0}")]
    SourceUnavailable(String),

    /// Snapshot store or codec failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl PlaybackError {
    pub(crate) fn open_failed(item_id: impl Into<String>, err: &EngineError) -> Self {
        Self::EngineOpenFailed {
            item_id: item_id.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn command_failed(command: EngineCommand, err: &EngineError) -> Self {
        Self::EngineCommandFailed {
            command,
            reason: err.to_string(),
        }
    }
}

/// Errors reported by a [`PlayerEngine`](crate::PlayerEngine) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Resource missing, unsupported format, permission revoked...
    #[error("open failed: {0}")]
    OpenFailed(String),

    /// Command rejected by the engine
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Optional capability not implemented by this engine
    #[error("capability not supported")]
    Unsupported,

    /// Session handle no longer refers to a loaded resource
    #[error("session already released")]
    SessionReleased,
}

/// Snapshot codec / store errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Blob could not be encoded or decoded
    #[error("Snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Backing store failed
    #[error("Snapshot store error: {0}")]
    Store(String),

    /// Blob was written by an incompatible version
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),
}

impl From<SnapshotError> for PlaybackError {
    fn from(err: SnapshotError) -> Self {
        PlaybackError::Persistence(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
