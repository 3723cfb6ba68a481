//! Play queue with original and play order
//!
//! Structure:
//! ```text
//! original order:  [A, B, C, D]        (as provided by the caller)
//! play order:      [2, 0, 3, 1]        (indices into original order)
//!                   ^
//!                   current index
//! ```
//!
//! The play order is stored as a permutation of indices, so it always
//! contains exactly the items of the original order (duplicates included).

use crate::shuffle::shuffled_indices;
use crate::types::PlayableItem;
use rand::Rng;

#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Items in caller-provided order
    items: Vec<PlayableItem>,

    /// Traversal order, indices into `items`
    order: Vec<usize>,

    /// Position in `order`; `None` iff the queue is empty
    current: Option<usize>,

    /// Whether `order` is a shuffled permutation
    shuffled: bool,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue contents
    ///
    /// `start_index` is an index into `items` and is clamped into range.
    /// With shuffle on, the start item is placed first in the play order.
    pub fn replace<R: Rng + ?Sized>(
        &mut self,
        items: Vec<PlayableItem>,
        start_index: usize,
        shuffle: bool,
        rng: &mut R,
    ) {
        self.items = items;
        self.shuffled = shuffle;

        if self.items.is_empty() {
            self.order.clear();
            self.current = None;
            return;
        }

        let start = start_index.min(self.items.len() - 1);
        if shuffle {
            self.order = shuffled_indices(self.items.len(), start, rng);
            self.current = Some(0);
        } else {
            self.order = (0..self.items.len()).collect();
            self.current = Some(start);
        }
    }

    /// Rebuild from a persisted play order
    ///
    /// Falls back to a fresh order (shuffled around the current item if
    /// `shuffle` is set) when `play_order_ids` is not a permutation of
    /// `items` by id.
    pub fn restore<R: Rng + ?Sized>(
        &mut self,
        items: Vec<PlayableItem>,
        play_order_ids: &[String],
        current_index: Option<usize>,
        shuffle: bool,
        rng: &mut R,
    ) {
        match Self::resolve_order(&items, play_order_ids) {
            Some(order) if !items.is_empty() => {
                let current = current_index.unwrap_or(0).min(order.len() - 1);
                self.items = items;
                self.order = order;
                self.current = Some(current);
                self.shuffled = shuffle;
            }
            _ => {
                // current_index referred to the lost order; best effort keeps it as an item index
                self.replace(items, current_index.unwrap_or(0), shuffle, rng);
            }
        }
    }

    /// Map ids back to item indices, consuming each item at most once
    fn resolve_order(items: &[PlayableItem], ids: &[String]) -> Option<Vec<usize>> {
        if ids.len() != items.len() {
            return None;
        }

        let mut used = vec![false; items.len()];
        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            let index = items
                .iter()
                .enumerate()
                .position(|(i, item)| !used[i] && &item.id == id)?;
            used[index] = true;
            order.push(index);
        }
        Some(order)
    }

    /// Clear entire queue
    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
        self.current = None;
    }

    /// Number of items in the queue
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current position in the play order
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Currently selected item
    pub fn current(&self) -> Option<&PlayableItem> {
        self.current.map(|i| &self.items[self.order[i]])
    }

    /// Items in caller-provided order
    pub fn original_order(&self) -> &[PlayableItem] {
        &self.items
    }

    /// Items in traversal order
    pub fn play_order(&self) -> Vec<&PlayableItem> {
        self.order.iter().map(|&i| &self.items[i]).collect()
    }

    pub fn play_order_ids(&self) -> Vec<String> {
        self.order.iter().map(|&i| self.items[i].id.clone()).collect()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    /// Turn shuffle on or off, keeping the current item current
    ///
    /// On: the current item moves to the front of a fresh permutation.
    /// Off: the play order returns to the original order and the current
    /// index becomes the current item's original position.
    pub fn set_shuffle<R: Rng + ?Sized>(&mut self, shuffle: bool, rng: &mut R) {
        self.shuffled = shuffle;

        let Some(current) = self.current else {
            return;
        };
        let current_item = self.order[current];

        if shuffle {
            self.order = shuffled_indices(self.items.len(), current_item, rng);
            self.current = Some(0);
        } else {
            self.order = (0..self.items.len()).collect();
            self.current = Some(current_item);
        }
    }

    /// Index that follows the current one, wrapping if `wrap` is set
    pub fn next_index(&self, wrap: bool) -> Option<usize> {
        let current = self.current?;
        if current + 1 < self.order.len() {
            Some(current + 1)
        } else if wrap {
            Some(0)
        } else {
            None
        }
    }

    /// Index before the current one; never wraps
    pub fn previous_index(&self) -> Option<usize> {
        self.current.and_then(|current| current.checked_sub(1))
    }

    /// Make `index` (into the play order) current
    ///
    /// Returns false if out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.order.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }
}
