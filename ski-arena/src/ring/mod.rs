//! A bounded, multi-producer multi-consumer ring buffer used for the
//! submission queue, completion queue, and the IO rings.
//!
//! The slot protocol is Dmitry Vyukov's bounded MPMC queue: each slot
//! carries its own sequence number so producers and consumers can claim
//! slots with a single CAS each, with no single global lock. Blocking
//! variants park on a `parking_lot::Condvar` instead of busy-spinning,
//! since these rings are crossed by OS threads rather than an in-process
//! event loop with a futex-style wait primitive to hand.

mod cq;
mod io;
mod sq;

pub use cq::Cqe;
pub use io::IoRing;
pub use sq::Sqe;

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::sync::CachePadded;

struct Slot<T> {
    seq: AtomicU32,
    payload: UnsafeCell<Option<T>>,
}

// SAFETY: a slot's payload is only read/written after its sequence number
// has been validated, which establishes a happens-before edge between the
// writer's release store and the reader's acquire load.
unsafe impl<T: Send> Sync for Slot<T> {}

/// A bounded MPMC ring of capacity `entries` (always a power of two).
pub struct Ring<T> {
    head: CachePadded<AtomicU32>,
    tail: CachePadded<AtomicU32>,
    mask: u32,
    slots: Vec<Slot<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    wait_lock: Mutex<()>,
}

impl<T> Ring<T> {
    pub fn new(entries: u32) -> Self {
        assert!(entries.is_power_of_two(), "ring capacity must be a power of two");
        let slots = (0..entries)
            .map(|i| Slot { seq: AtomicU32::new(i), payload: UnsafeCell::new(None) })
            .collect();
        Ring {
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            mask: entries - 1,
            slots,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            wait_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of entries currently queued. Racy under concurrent use — for
    /// diagnostics only, never for correctness.
    pub fn len_hint(&self) -> u32 {
        self.tail.load(Ordering::Relaxed).wrapping_sub(self.head.load(Ordering::Relaxed))
    }

    pub fn try_enqueue(&self, item: T) -> bool {
        loop {
            let t = self.tail.load(Ordering::Relaxed);
            let slot = &self.slots[(t & self.mask) as usize];
            let s = slot.seq.load(Ordering::Acquire);
            let diff = s.wrapping_sub(t) as i32;

            if diff == 0 {
                if self
                    .tail
                    .compare_exchange_weak(t, t.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    unsafe { *slot.payload.get() = Some(item) };
                    slot.seq.store(t.wrapping_add(1), Ordering::Release);
                    let _guard = self.wait_lock.lock();
                    self.not_empty.notify_one();
                    return true;
                }
            } else if diff < 0 {
                return false; // ring full
            }
        }
    }

    pub fn try_dequeue(&self) -> Option<T> {
        loop {
            let h = self.head.load(Ordering::Relaxed);
            let slot = &self.slots[(h & self.mask) as usize];
            let s = slot.seq.load(Ordering::Acquire);
            let diff = s.wrapping_sub(h.wrapping_add(1)) as i32;

            if diff == 0 {
                if self
                    .head
                    .compare_exchange_weak(h, h.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    let item = unsafe { (*slot.payload.get()).take() };
                    slot.seq.store(h.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);
                    let _guard = self.wait_lock.lock();
                    self.not_full.notify_one();
                    return item;
                }
            } else if diff < 0 {
                return None; // ring empty
            }
        }
    }

}

impl<T: Clone> Ring<T> {
    /// Block the calling thread until `item` can be enqueued.
    pub fn enqueue_blocking(&self, item: T) {
        loop {
            if self.try_enqueue(item.clone()) {
                return;
            }
            let mut guard = self.wait_lock.lock();
            if self.len_hint() >= self.capacity() {
                self.not_full.wait(&mut guard);
            }
        }
    }
}

impl<T> Ring<T> {
    /// Block the calling thread until an item can be dequeued.
    pub fn dequeue_blocking(&self) -> T {
        loop {
            if let Some(item) = self.try_dequeue() {
                return item;
            }
            let mut guard = self.wait_lock.lock();
            if self.len_hint() == 0 {
                self.not_empty.wait(&mut guard);
            }
        }
    }
}
