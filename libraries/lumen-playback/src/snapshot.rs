//! Resume snapshots
//!
//! The queue, selection, modes and last known position are encoded as a
//! JSON blob and kept in a key-value store. A restored session is never
//! playing: `was_playing` is informational only and playback resumes on an
//! explicit `play()`.

use crate::error::SnapshotError;
use crate::types::{LoopMode, PlayableItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub version: u32,

    /// Queue in caller-provided order
    pub items: Vec<PlayableItem>,

    /// Traversal order as item ids
    #[serde(default)]
    pub play_order: Vec<String>,

    /// Index into the play order
    pub current_index: Option<usize>,

    pub shuffle: bool,

    pub loop_mode: LoopMode,

    /// Last position reported by the engine
    pub position_ms: u64,

    /// Whether the session was playing when written
    pub was_playing: bool,
}

impl QueueSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(blob: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(blob)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}

/// Key-value blob store used for snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError>;

    async fn set(&self, key: &str, blob: Vec<u8>) -> Result<(), SnapshotError>;

    async fn remove(&self, key: &str) -> Result<(), SnapshotError>;
}

/// In-process store, for tests and platforms without durable storage
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: Vec<u8>) -> Result<(), SnapshotError> {
        self.blobs.lock().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SnapshotError> {
        self.blobs.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_snapshot() -> QueueSnapshot {
        QueueSnapshot {
            version: SNAPSHOT_VERSION,
            items: vec![
                PlayableItem::new("a", "/music/a.mp3", "A")
                    .with_duration_hint(Duration::from_secs(200)),
                PlayableItem::new("b", "/music/b.mp3", "B").with_artist("Band"),
            ],
            play_order: vec!["b".to_string(), "a".to_string()],
            current_index: Some(1),
            shuffle: true,
            loop_mode: LoopMode::RepeatAll,
            position_ms: 42_000,
            was_playing: true,
        }
    }

    #[test]
    fn encode_decode_preserves_session() {
        let snapshot = sample_snapshot();
        let decoded = QueueSnapshot::decode(&snapshot.encode().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn decode_rejects_future_version() {
        let mut snapshot = sample_snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let blob = serde_json::to_vec(&snapshot).unwrap();

        assert!(matches!(
            QueueSnapshot::decode(&blob),
            Err(SnapshotError::UnsupportedVersion(v)) if v == SNAPSHOT_VERSION + 1
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            QueueSnapshot::decode(b"not json"),
            Err(SnapshotError::Codec(_))
        ));
    }

    #[test]
    fn missing_play_order_defaults_to_empty() {
        let blob = br#"{
            "version": 1,
            "items": [{ "id": "a", "uri": "/a.mp3", "title": "A" }],
            "current_index": 0,
            "shuffle": false,
            "loop_mode": "Off",
            "position_ms": 0,
            "was_playing": false
        }"#;

        let snapshot = QueueSnapshot::decode(blob).unwrap();
        assert!(snapshot.play_order.is_empty());
        assert_eq!(snapshot.items[0].id, "a");
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1, 2, 3]));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
