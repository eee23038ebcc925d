//! A worker pulls one submission at a time off the shared ring and runs the
//! reducer against the shared arena. Workers never touch request
//! bookkeeping — that's the host's job — they only ever see node ids.

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use libski::{Kind, EMPTY_ID};

use crate::arena::Arena;
use crate::error::Error;
use crate::reducer::{self, StepOutcome};
use crate::ring::{Cqe, IoRing, Ring, Sqe};

/// How long a worker sleeps between empty-ring polls while waiting for
/// work. Real io_uring-style rings would park on a futex instead; without
/// one available in portable safe Rust, a short sleep keeps shutdown
/// responsive without busy-spinning a whole core.
const IDLE_POLL: Duration = Duration::from_micros(200);

pub struct Worker {
    pub id: usize,
    arena: Arc<Arena>,
    sq: Arc<Ring<Sqe>>,
    cq: Arc<Ring<Cqe>>,
    io: Arc<IoRing>,
}

impl Worker {
    pub fn new(id: usize, arena: Arc<Arena>, sq: Arc<Ring<Sqe>>, cq: Arc<Ring<Cqe>>, io: Arc<IoRing>) -> Self {
        Worker { id, arena, sq, cq, io }
    }

    /// Run until `shutdown` is set. Intended to be the body of a dedicated
    /// OS thread — see [`crate::worker::spawn_pool`].
    pub fn run(&self, shutdown: &AtomicBool) {
        log::info!("worker {} starting", self.id);
        loop {
            let sqe = match self.sq.try_dequeue() {
                Some(sqe) => sqe,
                None => {
                    if shutdown.load(Ordering::Relaxed) {
                        log::info!("worker {} stopping", self.id);
                        return;
                    }
                    std::thread::sleep(IDLE_POLL);
                    continue;
                }
            };
            let cqe = self.process(sqe);
            self.cq.enqueue_blocking(cqe);
        }
    }

    /// Evaluate one submission, resuming it first if it names a
    /// Suspension rather than a fresh expression.
    fn process(&self, sqe: Sqe) -> Cqe {
        let is_resume = sqe.node_id != EMPTY_ID && self.arena.kind_of(sqe.node_id) == Kind::Suspension;
        let outcome = if is_resume {
            reducer::resume(&self.arena, self.io.as_ref(), sqe.node_id, u32::MAX, sqe.max_steps)
        } else {
            reducer::step(&self.arena, self.io.as_ref(), sqe.node_id, u32::MAX, sqe.max_steps)
        };

        match outcome {
            Ok(StepOutcome::Done(result)) => {
                Cqe { node_id: result, req_id: sqe.req_id, suspended: false, fault: None }
            }
            Ok(StepOutcome::Suspended(susp)) => {
                Cqe { node_id: susp, req_id: sqe.req_id, suspended: true, fault: None }
            }
            // A fatal arena error (growth past max capacity, say) leaves
            // nothing sensible to hand back as a node id, so it's carried
            // back via `fault` instead: the host reports it as a failed
            // request rather than treating `EMPTY_ID` as a real result.
            Err(e) => {
                log::error!("worker {} trapped on request {}: {e}", self.id, sqe.req_id);
                let fault = Error::WorkerCrashed(e.to_string());
                Cqe { node_id: EMPTY_ID, req_id: sqe.req_id, suspended: false, fault: Some(fault) }
            }
        }
    }
}

/// Spawn `count` worker threads sharing one arena and ring set, returning
/// their join handles. Call `shutdown.store(true, ...)` and join to stop
/// the pool.
pub fn spawn_pool(
    count: usize,
    arena: Arc<Arena>,
    sq: Arc<Ring<Sqe>>,
    cq: Arc<Ring<Cqe>>,
    io: Arc<IoRing>,
    shutdown: Arc<AtomicBool>,
) -> Vec<std::thread::JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let worker = Worker::new(id, Arc::clone(&arena), Arc::clone(&sq), Arc::clone(&cq), Arc::clone(&io));
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name(format!("ski-arena-worker-{id}"))
                .spawn(move || worker.run(&shutdown))
                .expect("failed to spawn worker thread")
        })
        .collect()
}
