use super::*;
use crate::config::Config;
use libski::Symbol;
use std::sync::atomic::AtomicBool;

fn rig() -> (Arc<Arena>, Arc<Ring<Sqe>>, Arc<Ring<Cqe>>, Arc<IoRing>) {
    let config = Config::builder().initial_capacity(64).bucket_count(64).build().unwrap();
    (
        Arc::new(Arena::new(&config)),
        Arc::new(Ring::new(8)),
        Arc::new(Ring::new(8)),
        Arc::new(IoRing::new(8)),
    )
}

#[test]
fn processes_a_fresh_submission_to_completion() {
    let (arena, sq, cq, io) = rig();
    let worker = Worker::new(0, Arc::clone(&arena), sq, cq, io);
    let i = arena.alloc_terminal(Symbol::I).unwrap();
    let x = arena.alloc_terminal(Symbol::K).unwrap();
    let expr = arena.alloc_cons(i, x).unwrap();

    let cqe = worker.process(Sqe { node_id: expr, req_id: 5, max_steps: 16 });
    assert!(!cqe.suspended);
    assert_eq!(cqe.node_id, x);
    assert_eq!(cqe.req_id, 5);
}

#[test]
fn zero_step_budget_suspends_and_is_resumable() {
    let (arena, sq, cq, io) = rig();
    let worker = Worker::new(0, Arc::clone(&arena), sq, cq, io);
    let i = arena.alloc_terminal(Symbol::I).unwrap();
    let x = arena.alloc_terminal(Symbol::K).unwrap();
    let expr = arena.alloc_cons(i, x).unwrap();

    let first = worker.process(Sqe { node_id: expr, req_id: 1, max_steps: 0 });
    assert!(first.suspended);
    assert_eq!(arena.kind_of(first.node_id), Kind::Suspension);

    let second = worker.process(Sqe { node_id: first.node_id, req_id: 1, max_steps: 16 });
    assert!(!second.suspended);
    assert_eq!(second.node_id, x);
}

#[test]
fn worker_pool_drains_the_submission_ring() {
    let (arena, sq, cq, io) = rig();
    let i = arena.alloc_terminal(Symbol::I).unwrap();
    let x = arena.alloc_terminal(Symbol::K).unwrap();
    let expr = arena.alloc_cons(i, x).unwrap();
    sq.try_enqueue(Sqe { node_id: expr, req_id: 0, max_steps: 16 });

    let shutdown = Arc::new(AtomicBool::new(false));
    let handles = spawn_pool(2, arena, sq, Arc::clone(&cq), io, Arc::clone(&shutdown));

    let cqe = cq.dequeue_blocking();
    assert_eq!(cqe.node_id, x);

    shutdown.store(true, Ordering::Relaxed);
    for h in handles {
        h.join().unwrap();
    }
}
