//! Shuffle permutations for the play order
//!
//! Fisher-Yates over everything except the pinned (current) item, which is
//! always placed first.

use crate::types::PlayableItem;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Build a shuffled copy of `items` with the item `current_item_id` first
///
/// The remaining items follow in uniformly random order; every call
/// differs. If `current_item_id` is not present, index 0 is pinned.
pub fn build_shuffled_order(items: &[PlayableItem], current_item_id: &str) -> Vec<PlayableItem> {
    build_shuffled_order_with(items, current_item_id, &mut thread_rng())
}

/// Same as [`build_shuffled_order`] with a caller-supplied random source
pub fn build_shuffled_order_with<R: Rng + ?Sized>(
    items: &[PlayableItem],
    current_item_id: &str,
    rng: &mut R,
) -> Vec<PlayableItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let pinned = items
        .iter()
        .position(|item| item.id == current_item_id)
        .unwrap_or(0);

    shuffled_indices(items.len(), pinned, rng)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

/// Permutation of `0..len` starting with `pinned`, rest uniformly shuffled
///
/// `pinned` must be `< len` unless `len == 0`.
pub(crate) fn shuffled_indices<R: Rng + ?Sized>(
    len: usize,
    pinned: usize,
    rng: &mut R,
) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }

    let mut rest: Vec<usize> = (0..len).filter(|&i| i != pinned).collect();
    rest.shuffle(rng);

    let mut order = Vec::with_capacity(len);
    order.push(pinned);
    order.extend(rest);
    order
}
