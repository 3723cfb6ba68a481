//! Side-effect hooks
//!
//! Called synchronously from the controller; implementations must not
//! block and should spawn any real work (lyrics download, history sync).

use crate::types::PlayableItem;

pub trait PlaybackHooks: Send + Sync {
    /// An item became current and its engine open was issued
    ///
    /// Fire-and-forget: transport state never waits on this.
    fn item_loaded(&self, item: &PlayableItem) {
        let _ = item;
    }

    /// Playback started for the first time for the current session
    ///
    /// Not called on resume from pause.
    fn playback_started(&self, item: &PlayableItem) {
        let _ = item;
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl PlaybackHooks for NoopHooks {}
