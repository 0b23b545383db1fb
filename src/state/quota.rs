use std::cell::Cell;

/// Last observed upstream quota, as reported by response headers
///
/// Both values are unknown until the first successful response of the
/// process. Nothing here is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
    /// Billed calls still allowed in the current window
    pub remaining: Option<u32>,

    /// Size of the quota window
    pub limit: Option<u32>,
}

impl QuotaState {
    /// Returns true if the remaining quota is known and at most 1
    ///
    /// An unknown quota is never treated as exhausted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(remaining) if remaining <= 1)
    }
}

/// Single-writer handle over the process quota state
///
/// The request executor owns the tracker and is the only writer; the
/// coordinator reads it through the executor before every billed call.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    state: Cell<QuotaState>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current state
    pub fn snapshot(&self) -> QuotaState {
        self.state.get()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.get().is_exhausted()
    }

    /// Records the values parsed from a successful response
    ///
    /// Each field is replaced only when the response carried it, so a
    /// response without quota headers keeps the last known values.
    pub(crate) fn observe(&self, remaining: Option<u32>, limit: Option<u32>) {
        let mut state = self.state.get();
        if remaining.is_some() {
            state.remaining = remaining;
        }
        if limit.is_some() {
            state.limit = limit;
        }
        self.state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_quota_is_not_exhausted() {
        let tracker = QuotaTracker::new();
        assert_eq!(tracker.snapshot(), QuotaState::default());
        assert!(!tracker.is_exhausted());
    }

    #[test]
    fn test_exhaustion_threshold() {
        let tracker = QuotaTracker::new();

        tracker.observe(Some(2), Some(40));
        assert!(!tracker.is_exhausted());

        tracker.observe(Some(1), None);
        assert!(tracker.is_exhausted());

        tracker.observe(Some(0), None);
        assert!(tracker.is_exhausted());
    }

    #[test]
    fn test_missing_fields_keep_last_values() {
        let tracker = QuotaTracker::new();
        tracker.observe(Some(30), Some(40));
        tracker.observe(None, None);

        let state = tracker.snapshot();
        assert_eq!(state.remaining, Some(30));
        assert_eq!(state.limit, Some(40));

        tracker.observe(Some(29), None);
        assert_eq!(tracker.snapshot().limit, Some(40));
    }
}
