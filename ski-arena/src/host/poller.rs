use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::Error;
use crate::ring::{Cqe, Ring, Sqe};

use super::request::RequestTracker;

/// A request's terminal state, once it stops being resubmitted.
#[derive(Debug, Clone)]
pub enum Outcome {
    Done(u32),
    Failed(Error),
}

/// Drains the completion ring, resubmitting suspended work units (up to
/// each request's resubmission cap) and recording terminal outcomes for
/// everything else. A `tokio::select!` between a shutdown signal and a
/// bounded unit of work, yielding back to the runtime every pass instead of
/// spinning.
pub struct Poller {
    sq: Arc<Ring<Sqe>>,
    cq: Arc<Ring<Cqe>>,
    tracker: Arc<RequestTracker>,
    resume_step_budget: u32,
    results: Mutex<HashMap<u32, Outcome>>,
    dead: Arc<AtomicBool>,
}

impl Poller {
    pub fn new(
        sq: Arc<Ring<Sqe>>,
        cq: Arc<Ring<Cqe>>,
        tracker: Arc<RequestTracker>,
        resume_step_budget: u32,
        dead: Arc<AtomicBool>,
    ) -> Self {
        Poller { sq, cq, tracker, resume_step_budget, results: Mutex::new(HashMap::new()), dead }
    }

    /// Drain everything currently sitting in the completion ring. Returns
    /// how many completions were processed.
    pub fn drain_once(&self) -> usize {
        let mut processed = 0;
        while let Some(cqe) = self.cq.try_dequeue() {
            processed += 1;
            self.handle_completion(cqe);
        }
        processed
    }

    fn handle_completion(&self, cqe: Cqe) {
        if let Some(err) = cqe.fault {
            self.tracker.complete(cqe.req_id);
            if err.is_fatal() {
                self.dead.store(true, Ordering::Release);
            }
            self.results.lock().insert(cqe.req_id, Outcome::Failed(err));
            return;
        }

        if !cqe.suspended {
            self.tracker.complete(cqe.req_id);
            self.results.lock().insert(cqe.req_id, Outcome::Done(cqe.node_id));
            return;
        }

        match self.tracker.record_resubmit(cqe.req_id) {
            Ok(()) => {
                let sqe = Sqe { node_id: cqe.node_id, req_id: cqe.req_id, max_steps: self.resume_step_budget };
                if !self.sq.try_enqueue(sqe) {
                    self.tracker.complete(cqe.req_id);
                    self.results.lock().insert(cqe.req_id, Outcome::Failed(Error::SubmitFull));
                }
            }
            Err(limit_err) => {
                log::warn!("request {} exceeded its resubmission cap", cqe.req_id);
                self.tracker.complete(cqe.req_id);
                self.results.lock().insert(cqe.req_id, Outcome::Failed(limit_err));
            }
        }
    }

    pub fn take_result(&self, req_id: u32) -> Option<Outcome> {
        self.results.lock().remove(&req_id)
    }

    /// Run the drain loop until `shutdown` reports `true`, cooperatively
    /// yielding between passes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(1)) => {
                    self.drain_once();
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libski::EMPTY_ID;

    fn setup() -> (Poller, Arc<Ring<Sqe>>, Arc<Ring<Cqe>>) {
        let sq = Arc::new(Ring::new(8));
        let cq = Arc::new(Ring::new(8));
        let tracker = Arc::new(RequestTracker::new(2));
        let dead = Arc::new(AtomicBool::new(false));
        let poller = Poller::new(Arc::clone(&sq), Arc::clone(&cq), tracker, 1024, dead);
        (poller, sq, cq)
    }

    #[test]
    fn done_completion_records_result() {
        let (poller, _sq, cq) = setup();
        poller.tracker.register();
        assert!(cq.try_enqueue(Cqe { node_id: 99, req_id: 0, suspended: false, fault: None }));
        assert_eq!(poller.drain_once(), 1);
        match poller.take_result(0).unwrap() {
            Outcome::Done(v) => assert_eq!(v, 99),
            Outcome::Failed(_) => panic!("expected Done"),
        }
    }

    #[test]
    fn suspended_completion_resubmits() {
        let (poller, sq, cq) = setup();
        poller.tracker.register();
        assert!(cq.try_enqueue(Cqe { node_id: 7, req_id: 0, suspended: true, fault: None }));
        poller.drain_once();
        let resubmitted = sq.try_dequeue().unwrap();
        assert_eq!(resubmitted.node_id, 7);
        assert_eq!(resubmitted.req_id, 0);
        assert!(poller.take_result(0).is_none());
    }

    #[test]
    fn exceeding_resubmit_cap_fails_the_request() {
        let (poller, _sq, cq) = setup();
        poller.tracker.register();
        for _ in 0..3 {
            assert!(cq.try_enqueue(Cqe { node_id: 7, req_id: 0, suspended: true, fault: None }));
            poller.drain_once();
        }
        match poller.take_result(0).unwrap() {
            Outcome::Failed(Error::ResubmissionLimitExceeded) => {}
            other => panic!("expected resubmission-limit failure, got {other:?}"),
        }
    }

    #[test]
    fn fatal_fault_marks_the_evaluator_dead() {
        let (poller, _sq, cq) = setup();
        poller.tracker.register();
        let fault = Error::WorkerCrashed("arena exhausted: growth would exceed max capacity".to_string());
        assert!(cq.try_enqueue(Cqe { node_id: EMPTY_ID, req_id: 0, suspended: false, fault: Some(fault) }));
        poller.drain_once();
        assert!(poller.dead.load(Ordering::Acquire));
        match poller.take_result(0).unwrap() {
            Outcome::Failed(Error::WorkerCrashed(_)) => {}
            other => panic!("expected worker-crashed failure, got {other:?}"),
        }
    }
}
