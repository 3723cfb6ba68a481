//! Core types for playback control

use crate::error::PlaybackError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of media behind a [`PlayableItem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
}

/// An addressable media resource (audio track or video)
///
/// The controller never mutates item contents, only their ordering and
/// selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableItem {
    /// Stable unique identifier from the media source
    pub id: String,

    /// Resource locator the engine can open
    pub uri: String,

    /// Display title
    pub title: String,

    /// Artist (audio) or subtitle (video)
    #[serde(default)]
    pub artist: Option<String>,

    /// Album name (optional)
    #[serde(default)]
    pub album: Option<String>,

    /// Duration as reported by the library, corrected once loaded
    #[serde(default)]
    pub duration_hint: Option<Duration>,

    /// Artwork / thumbnail locator
    #[serde(default)]
    pub artwork_uri: Option<String>,

    #[serde(default)]
    pub kind: MediaKind,
}

impl PlayableItem {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            title: title.into(),
            artist: None,
            album: None,
            duration_hint: None,
            artwork_uri: None,
            kind: MediaKind::Audio,
        }
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    #[must_use]
    pub fn with_duration_hint(mut self, duration: Duration) -> Self {
        self.duration_hint = Some(duration);
        self
    }

    #[must_use]
    pub fn with_artwork(mut self, artwork_uri: impl Into<String>) -> Self {
        self.artwork_uri = Some(artwork_uri.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Transport state of the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    /// No item loaded
    #[default]
    Idle,

    /// Open issued to the engine, awaiting first status
    Loading,

    /// Engine loaded and playing
    Playing,

    /// Engine loaded and paused, or resumable snapshot restored
    Paused,

    /// Queue finished: engine unloaded, queue retained
    Stopped,

    /// Last engine operation failed, see `last_error`
    Error,
}

/// Loop mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Replay the current item
    RepeatOne,

    /// Wrap to the start of the play order
    RepeatAll,
}

/// Position and duration as last reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub position_ms: u64,
    pub duration_ms: u64,
}

impl PlaybackPosition {
    pub const ZERO: Self = Self {
        position_ms: 0,
        duration_ms: 0,
    };

    /// Progress in `[0.0, 1.0]`, zero when the duration is unknown
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.position_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
        }
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Recently-played history size (default: 50)
    pub history_size: usize,

    /// Initial volume (0-100, default: 100)
    pub volume: u8,

    /// Initial playback rate (default: 1.0)
    pub rate: f32,

    /// Key of the resume snapshot in the persistence store
    pub snapshot_key: String,

    /// Minimum position delta between snapshot writes from status events
    pub position_persist_interval_ms: u64,

    /// Bound of the drained event queue
    pub max_pending_events: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            history_size: 50,
            volume: 100,
            rate: 1.0,
            snapshot_key: "lumen.playback.snapshot".to_string(),
            position_persist_interval_ms: 5_000,
            max_pending_events: 256,
        }
    }
}

/// Read-only state published to UI consumers
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackView {
    pub current_item: Option<PlayableItem>,
    pub current_index: Option<usize>,
    pub queue_len: usize,
    pub transport: TransportState,
    pub position: PlaybackPosition,
    pub shuffle: bool,
    pub loop_mode: LoopMode,
    pub sleep_timer_fires_at: Option<DateTime<Utc>>,
    pub last_error: Option<PlaybackError>,
    pub volume: u8,
    pub muted: bool,
    pub rate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.history_size, 50);
        assert_eq!(config.volume, 100);
        assert_eq!(config.rate, 1.0);
        assert_eq!(config.position_persist_interval_ms, 5_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{ "history_size": 10, "snapshot_key": "resume" }"#).unwrap();
        assert_eq!(config.history_size, 10);
        assert_eq!(config.snapshot_key, "resume");
        assert_eq!(config.max_pending_events, 256);
    }

    #[test]
    fn item_builder() {
        let item = PlayableItem::new("v1", "file:///movies/clip.mp4", "Clip")
            .with_artist("Director")
            .with_duration_hint(Duration::from_secs(95))
            .with_kind(MediaKind::Video);

        assert_eq!(item.id, "v1");
        assert_eq!(item.artist.as_deref(), Some("Director"));
        assert_eq!(item.duration_hint, Some(Duration::from_secs(95)));
        assert_eq!(item.kind, MediaKind::Video);
    }

    #[test]
    fn progress_handles_unknown_duration() {
        assert_eq!(PlaybackPosition::ZERO.progress(), 0.0);
        let halfway = PlaybackPosition {
            position_ms: 500,
            duration_ms: 1_000,
        };
        assert_eq!(halfway.progress(), 0.5);
    }
}
