// Debounced tile rebuild scheduling
//
// Visibility changes arrive in bursts while the camera moves. The scheduler keeps
// at most one pending rebuild; notifications that arrive while one is pending are
// absorbed into it. Time is passed in by the caller so the host decides what
// clock drives it.

use std::time::Duration;

use tracing::debug;

/// Debounce interval between the first visibility change and the rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// The single outstanding rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRebuild {
    pub deadline: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub notifications: u64,
    pub absorbed: u64,
    pub passes: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    debounce: Duration,
    pending: Option<ScheduledRebuild>,
    stats: SchedulerStats,
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl UpdateScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record a visibility change at `now`. Returns true if this call scheduled a
    /// new rebuild, false if it was absorbed by the pending one.
    pub fn notify_visibility_changed(&mut self, now: Duration) -> bool {
        self.stats.notifications += 1;
        if self.pending.is_some() {
            self.stats.absorbed += 1;
            return false;
        }
        self.pending = Some(ScheduledRebuild {
            deadline: now + self.debounce,
        });
        true
    }

    pub fn pending(&self) -> Option<ScheduledRebuild> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending rebuild, if any.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            self.stats.cancelled += 1;
        }
    }

    /// Run `rebuild` if the pending deadline has passed. The pending marker is
    /// cleared only after the rebuild returns, so notifications raised by the
    /// rebuild itself are absorbed.
    pub fn fire_if_due<R>(&mut self, now: Duration, rebuild: impl FnOnce() -> R) -> Option<R> {
        let due = self.pending.is_some_and(|p| now >= p.deadline);
        if !due {
            return None;
        }

        debug!("rebuild due at {:?}, firing", now);
        let result = rebuild();
        self.pending = None;
        self.stats.passes += 1;
        Some(result)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}
