//! Sleep timer
//!
//! At most one timer is active. Firing posts a message into the
//! controller's inbox; the controller then stops playback. Each schedule
//! gets a fresh id so a firing that raced with `cancel` is recognised as
//! stale and ignored.

use crate::engine::Inbound;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Longest delay honoured; longer requests are clamped
pub(crate) const MAX_DELAY: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug)]
struct ActiveTimer {
    id: u64,
    fires_at: DateTime<Utc>,
    deadline: Instant,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub(crate) struct SleepTimer {
    active: Option<ActiveTimer>,
    last_id: u64,
}

impl SleepTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace any active timer with one firing after `after`, clamped to
    /// [`MAX_DELAY`]
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn schedule(
        &mut self,
        after: Duration,
        inbox: mpsc::UnboundedSender<Inbound>,
    ) -> DateTime<Utc> {
        self.cancel();

        self.last_id += 1;
        let id = self.last_id;
        let after = after.min(MAX_DELAY);
        let deadline = Instant::now() + after;
        let fires_at = chrono::Duration::from_std(after)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // Controller gone means nothing left to stop
            let _ = inbox.send(Inbound::SleepTimerFired { timer_id: id });
        });

        debug!("Sleep timer {} scheduled for {}", id, fires_at);
        self.active = Some(ActiveTimer {
            id,
            fires_at,
            deadline,
            task,
        });
        fires_at
    }

    /// Cancel the active timer; safe to call when none is active
    ///
    /// Returns whether a timer was cancelled.
    pub(crate) fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(timer) => {
                timer.task.abort();
                debug!("Sleep timer {} cancelled", timer.id);
                true
            }
            None => false,
        }
    }

    /// Consume a firing; true only for the currently active timer
    pub(crate) fn take_fired(&mut self, timer_id: u64) -> bool {
        if self.active.as_ref().is_some_and(|timer| timer.id == timer_id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn fires_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|timer| timer.fires_at)
    }

    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .map(|timer| timer.deadline.saturating_duration_since(Instant::now()))
    }
}

impl Drop for SleepTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
