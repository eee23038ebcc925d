//! The host: owns the arena and the rings, and runs a single cooperative
//! completion poller. Submission is the only thing callers do directly;
//! everything else — resubmission, cancellation bookkeeping, result
//! delivery — happens on the poller's drain loop.

mod poller;
mod request;

pub use poller::{Outcome, Poller};
pub use request::RequestTracker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::watch;

use crate::arena::Arena;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ring::{Cqe, IoRing, Ring, Sqe};
use crate::worker;

pub struct Host {
    arena: Arc<Arena>,
    sq: Arc<Ring<Sqe>>,
    cq: Arc<Ring<Cqe>>,
    io: Arc<IoRing>,
    tracker: Arc<RequestTracker>,
    poller: Arc<Poller>,
    default_step_budget: u32,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    /// Set once a fatal worker trap is observed; [`Host::submit`] refuses
    /// new work after that, since every node id handed out since may now be
    /// resting on a corrupted arena.
    dead: Arc<AtomicBool>,
}

impl Host {
    pub fn new(config: &Config) -> Self {
        let arena = Arc::new(Arena::new(config));
        let sq = Arc::new(Ring::new(config.sq_capacity()));
        let cq = Arc::new(Ring::new(config.cq_capacity()));
        let io = Arc::new(IoRing::new(config.sq_capacity()));
        let tracker = Arc::new(RequestTracker::new(config.max_resubmits_per_work_unit()));
        let dead = Arc::new(AtomicBool::new(false));
        let poller = Arc::new(Poller::new(
            Arc::clone(&sq),
            Arc::clone(&cq),
            Arc::clone(&tracker),
            config.default_step_budget(),
            Arc::clone(&dead),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Host {
            arena,
            sq,
            cq,
            io,
            tracker,
            poller,
            default_step_budget: config.default_step_budget(),
            shutdown_tx,
            shutdown_rx,
            dead,
        }
    }

    /// Spawn `count` worker threads wired to this host's own submission and
    /// completion rings. Callers still have to drive the poller themselves
    /// (via [`Host::run`] or repeated [`Host::drain_once`] calls) to turn
    /// completions into [`Outcome`]s.
    pub fn spawn_workers(&self, count: usize, shutdown: Arc<AtomicBool>) -> Vec<JoinHandle<()>> {
        worker::spawn_pool(
            count,
            Arc::clone(&self.arena),
            Arc::clone(&self.sq),
            Arc::clone(&self.cq),
            Arc::clone(&self.io),
            shutdown,
        )
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn io(&self) -> &Arc<IoRing> {
        &self.io
    }

    pub fn submission_ring(&self) -> &Arc<Ring<Sqe>> {
        &self.sq
    }

    /// Register and enqueue a fresh expression for evaluation. Returns the
    /// request id used to look up its eventual [`Outcome`].
    pub fn submit(&self, expr: u32) -> Result<u32> {
        if self.dead.load(Ordering::Acquire) {
            return Err(Error::Aborted);
        }
        let req_id = self.tracker.register();
        let sqe = Sqe { node_id: expr, req_id, max_steps: self.default_step_budget };
        if self.sq.try_enqueue(sqe) {
            Ok(req_id)
        } else {
            self.tracker.complete(req_id);
            Err(Error::SubmitFull)
        }
    }

    pub fn try_take_result(&self, req_id: u32) -> Option<Outcome> {
        self.poller.take_result(req_id)
    }

    pub fn inflight_count(&self) -> usize {
        self.tracker.inflight_count()
    }

    /// Run the completion poller until [`Host::shutdown`] is called.
    pub async fn run(&self) {
        self.poller.run(self.shutdown_rx.clone()).await;
    }

    /// One synchronous drain pass, for callers driving their own loop
    /// instead of spawning [`Host::run`] on a runtime.
    pub fn drain_once(&self) -> usize {
        self.poller.drain_once()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libski::Symbol;

    fn host() -> Host {
        let config = Config::builder().initial_capacity(64).bucket_count(64).build().unwrap();
        Host::new(&config)
    }

    #[test]
    fn submit_enqueues_and_tracks_a_request() {
        let host = host();
        let i = host.arena().alloc_terminal(Symbol::I).unwrap();
        let req_id = host.submit(i).unwrap();
        assert_eq!(host.inflight_count(), 1);
        let sqe = host.submission_ring().try_dequeue().unwrap();
        assert_eq!(sqe.node_id, i);
        assert_eq!(sqe.req_id, req_id);
    }

    #[test]
    fn submit_fails_once_ring_is_full() {
        let config = Config::builder()
            .initial_capacity(64)
            .bucket_count(64)
            .sq_capacity(2)
            .cq_capacity(2)
            .build()
            .unwrap();
        let host = Host::new(&config);
        let i = host.arena().alloc_terminal(Symbol::I).unwrap();
        host.submit(i).unwrap();
        host.submit(i).unwrap();
        let err = host.submit(i).unwrap_err();
        assert_eq!(err, Error::SubmitFull);
    }

    #[test]
    fn submit_is_rejected_once_the_evaluator_is_dead() {
        let host = host();
        host.dead.store(true, Ordering::Release);
        let i = host.arena().alloc_terminal(Symbol::I).unwrap();
        let err = host.submit(i).unwrap_err();
        assert_eq!(err, Error::Aborted);
    }
}
