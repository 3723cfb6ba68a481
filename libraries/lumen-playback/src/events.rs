//! Playback events
//!
//! Discrete notifications for UI synchronization, drained by the consumer.
//! The continuous state (position, flags) is also available through the
//! watch-based [`PlaybackView`](crate::PlaybackView) subscription; events
//! exist for the things a snapshot cannot express, such as "the queue just
//! finished" or "the sleep timer fired".

use crate::error::PlaybackError;
use crate::types::{LoopMode, TransportState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackEvent {
    /// Transport state changed
    StateChanged {
        from: TransportState,
        to: TransportState,
    },

    /// A different item became current
    ItemChanged {
        /// ID of the new current item
        item_id: String,
        /// Position in the play order
        index: usize,
    },

    /// Engine reported a new position
    PositionUpdate { position_ms: u64, duration_ms: u64 },

    /// Queue contents replaced or cleared
    QueueChanged { length: usize },

    /// End of queue reached with looping off
    QueueFinished,

    ShuffleChanged { enabled: bool },

    LoopModeChanged { mode: LoopMode },

    /// Sleep timer scheduled (`Some`) or cleared (`None`)
    SleepTimerChanged { fires_at: Option<DateTime<Utc>> },

    /// Sleep timer expired and playback was stopped
    SleepTimerFired,

    VolumeChanged { level: u8, is_muted: bool },

    RateChanged { rate: f32 },

    /// An engine failure was recorded as `last_error`
    Error { error: PlaybackError },
}

/// Bounded FIFO of pending events
///
/// When full, the oldest event is dropped.
#[derive(Debug, Clone)]
pub(crate) struct EventQueue {
    events: VecDeque<PlaybackEvent>,
    capacity: usize,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&mut self, event: PlaybackEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_in_emission_order() {
        let mut queue = EventQueue::new(8);
        queue.push(PlaybackEvent::QueueChanged { length: 3 });
        queue.push(PlaybackEvent::QueueFinished);

        assert_eq!(
            queue.drain(),
            vec![
                PlaybackEvent::QueueChanged { length: 3 },
                PlaybackEvent::QueueFinished
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut queue = EventQueue::new(2);
        queue.push(PlaybackEvent::QueueChanged { length: 1 });
        queue.push(PlaybackEvent::QueueChanged { length: 2 });
        queue.push(PlaybackEvent::QueueChanged { length: 3 });

        assert_eq!(
            queue.drain(),
            vec![
                PlaybackEvent::QueueChanged { length: 2 },
                PlaybackEvent::QueueChanged { length: 3 }
            ]
        );
    }
}
