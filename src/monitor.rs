//! Change monitor: debounced re-scan scheduling.
//!
//! Banner scripts routinely inject their markup well after load, so DOM
//! mutation bursts must re-trigger detection, but not once per mutation.
//! The monitor keeps exactly one pending deadline; every new burst
//! overwrites it, so only the most recent scheduling request survives and
//! the re-scan fires at the trailing edge of the burst.

use tokio::time::{Duration, Instant};

/// Pause after page load before the first detection pass, giving banner
/// scripts a moment to mount.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Trailing-edge debounce for mutation bursts.
pub const MUTATION_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct ChangeMonitor {
    debounce: Duration,
    deadline: Option<Instant>,
}

impl Default for ChangeMonitor {
    fn default() -> Self {
        Self::new(MUTATION_DEBOUNCE)
    }
}

impl ChangeMonitor {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
        }
    }

    /// Record a mutation burst at `now`; any pending deadline is replaced.
    pub fn note_mutation(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    /// The instant the next re-scan should run, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending deadline if it has elapsed at `now`.
    ///
    /// Returns true exactly once per elapsed deadline; the caller then
    /// decides whether the re-scan actually runs (the in-flight guard may
    /// drop it).
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_mutation_means_no_deadline() {
        let mut monitor = ChangeMonitor::default();
        assert_eq!(monitor.deadline(), None);
        assert!(!monitor.take_due(Instant::now()));
    }

    #[test]
    fn deadline_fires_once_at_trailing_edge() {
        let mut monitor = ChangeMonitor::new(Duration::from_millis(300));
        let t0 = Instant::now();
        monitor.note_mutation(t0);
        assert!(!monitor.take_due(t0 + Duration::from_millis(299)));
        assert!(monitor.take_due(t0 + Duration::from_millis(300)));
        // Consumed: does not fire again.
        assert!(!monitor.take_due(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn newer_burst_supersedes_pending_deadline() {
        let mut monitor = ChangeMonitor::new(Duration::from_millis(300));
        let t0 = Instant::now();
        monitor.note_mutation(t0);
        monitor.note_mutation(t0 + Duration::from_millis(200));
        // The original deadline has passed, but it was replaced.
        assert!(!monitor.take_due(t0 + Duration::from_millis(350)));
        assert!(monitor.take_due(t0 + Duration::from_millis(500)));
    }
}
