use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct RequestState {
    resubmits: u32,
}

/// Tracks in-flight requests across the submit/suspend/resubmit lifecycle,
/// independent of the completion ring itself — a request can be
/// resubmitted many times before it finally completes.
pub struct RequestTracker {
    next_id: AtomicU32,
    inflight: Mutex<HashMap<u32, RequestState>>,
    max_resubmits: u32,
}

impl RequestTracker {
    pub fn new(max_resubmits: u32) -> Self {
        RequestTracker {
            next_id: AtomicU32::new(0),
            inflight: Mutex::new(HashMap::new()),
            max_resubmits,
        }
    }

    /// Register a brand new request and return its id.
    pub fn register(&self) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inflight.lock().insert(id, RequestState::default());
        id
    }

    /// Count one resubmission against `req_id`'s cap.
    pub fn record_resubmit(&self, req_id: u32) -> Result<()> {
        let mut inflight = self.inflight.lock();
        let state = inflight.get_mut(&req_id).expect("resubmit on unregistered request");
        state.resubmits += 1;
        if state.resubmits > self.max_resubmits {
            Err(Error::ResubmissionLimitExceeded)
        } else {
            Ok(())
        }
    }

    /// Drop bookkeeping for a request that has reached a terminal outcome.
    pub fn complete(&self, req_id: u32) {
        self.inflight.lock().remove(&req_id);
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resubmits_past_cap_are_rejected() {
        let tracker = RequestTracker::new(2);
        let id = tracker.register();
        tracker.record_resubmit(id).unwrap();
        tracker.record_resubmit(id).unwrap();
        let err = tracker.record_resubmit(id).unwrap_err();
        assert_eq!(err, Error::ResubmissionLimitExceeded);
    }

    #[test]
    fn complete_drops_bookkeeping() {
        let tracker = RequestTracker::new(10);
        let id = tracker.register();
        assert_eq!(tracker.inflight_count(), 1);
        tracker.complete(id);
        assert_eq!(tracker.inflight_count(), 0);
    }
}
