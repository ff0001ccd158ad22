//! Backend heartbeat tracking.
//!
//! The stream backend sends `heartbeat` frames as a liveness signal. They are
//! not logged; only the receive time is kept so the console can show how long
//! ago the backend was last heard from.

use tracing::trace;

/// Last-heard tracker for heartbeat frames.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatTracker {
    /// Receive time of the last heartbeat (Unix milliseconds).
    last_ms: Option<i64>,
}

impl HeartbeatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat received at `now_ms`.
    pub fn record(&mut self, now_ms: i64) {
        self.last_ms = Some(now_ms);
        trace!(now_ms, "Recorded heartbeat");
    }

    /// Forget everything (called when a new credential is submitted).
    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    pub fn last_ms(&self) -> Option<i64> {
        self.last_ms
    }

    /// Whole seconds since the last heartbeat. Clock skew never goes negative.
    pub fn age_secs(&self, now_ms: i64) -> Option<u64> {
        self.last_ms
            .map(|last| (now_ms.saturating_sub(last).max(0) / 1000) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let hb = HeartbeatTracker::new();
        assert_eq!(hb.last_ms(), None);
        assert_eq!(hb.age_secs(1_000), None);
    }

    #[test]
    fn test_record_and_age() {
        let mut hb = HeartbeatTracker::new();
        hb.record(10_000);
        hb.record(12_000);
        assert_eq!(hb.last_ms(), Some(12_000));
        assert_eq!(hb.age_secs(12_999), Some(0));
        assert_eq!(hb.age_secs(15_500), Some(3));
        // Clock went backwards
        assert_eq!(hb.age_secs(11_000), Some(0));
    }

    #[test]
    fn test_reset() {
        let mut hb = HeartbeatTracker::new();
        hb.record(1);
        hb.reset();
        assert_eq!(hb.last_ms(), None);
    }
}
