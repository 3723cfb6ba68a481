//! Recently-played history
//!
//! Records an item the first time playback actually starts for it.
//! Bounded; the oldest entry is discarded when full.

use crate::types::PlayableItem;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History {
    /// Most recent = front
    items: VecDeque<PlayableItem>,

    /// Maximum history size
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Record an item as just played
    ///
    /// An item already in the history moves to the front instead of
    /// appearing twice.
    pub fn record(&mut self, item: &PlayableItem) {
        if self.max_size == 0 {
            return;
        }

        if let Some(pos) = self.items.iter().position(|i| i.id == item.id) {
            self.items.remove(pos);
        }
        if self.items.len() >= self.max_size {
            self.items.pop_back();
        }
        self.items.push_front(item.clone());
    }

    /// All entries, most recent first
    pub fn recent(&self) -> Vec<&PlayableItem> {
        self.items.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_item(id: &str) -> PlayableItem {
        PlayableItem::new(id, format!("/music/{}.mp3", id), format!("Track {}", id))
    }

    fn recent_ids(history: &History) -> Vec<&str> {
        history.recent().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn most_recent_first() {
        let mut history = History::new(10);
        history.record(&create_test_item("1"));
        history.record(&create_test_item("2"));
        history.record(&create_test_item("3"));

        assert_eq!(recent_ids(&history), vec!["3", "2", "1"]);
    }

    #[test]
    fn replay_moves_to_front() {
        let mut history = History::new(10);
        history.record(&create_test_item("1"));
        history.record(&create_test_item("2"));
        history.record(&create_test_item("1"));

        assert_eq!(recent_ids(&history), vec!["1", "2"]);
    }

    #[test]
    fn bounded_size_drops_oldest() {
        let mut history = History::new(3);
        for i in 1..=5 {
            history.record(&create_test_item(&i.to_string()));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(recent_ids(&history), vec!["5", "4", "3"]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut history = History::new(0);
        history.record(&create_test_item("1"));
        assert!(history.is_empty());
    }

    #[test]
    fn clear_history() {
        let mut history = History::default();
        history.record(&create_test_item("1"));
        history.clear();
        assert!(history.is_empty());
    }
}
