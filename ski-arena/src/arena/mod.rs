//! The hash-consed node store.
//!
//! Nodes live in flat, id-addressed columnar arrays (`kind`/`sym`/`left`/
//! `right`/`hash`/`next`) rather than as a graph of boxed structs, so the
//! same layout can be handed to a worker thread (or, in a future host, to a
//! shared-memory segment) without pointer-chasing or serialization. Growth
//! is rare and stop-the-world: everything but the grow path is careful to
//! only ever take a read lock on [`ArenaStorage`], so concurrent allocation
//! across worker threads never blocks on anything but a single stripe.

mod hash;
mod node;

#[cfg(test)]
mod tests;

pub use node::NodeSlot;

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use parking_lot::RwLock;

use libski::{Kind, Symbol, EMPTY_ID};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sync::StripeLocks;

const AC_REL: Ordering = Ordering::AcqRel;
const ACQ: Ordering = Ordering::Acquire;
const REL: Ordering = Ordering::Release;

struct ArenaStorage {
    capacity: u32,
    bucket_mask: u32,
    kind: Vec<AtomicU8>,
    sym: Vec<AtomicU8>,
    left: Vec<AtomicU32>,
    right: Vec<AtomicU32>,
    hash: Vec<AtomicU32>,
    next: Vec<AtomicU32>,
    buckets: Vec<AtomicU32>,
}

impl ArenaStorage {
    fn with_capacity(capacity: u32) -> Self {
        let n = capacity as usize;
        ArenaStorage {
            capacity,
            bucket_mask: capacity - 1,
            kind: (0..n).map(|_| AtomicU8::new(Kind::Hole as u8)).collect(),
            sym: (0..n).map(|_| AtomicU8::new(0)).collect(),
            left: (0..n).map(|_| AtomicU32::new(EMPTY_ID)).collect(),
            right: (0..n).map(|_| AtomicU32::new(EMPTY_ID)).collect(),
            hash: (0..n).map(|_| AtomicU32::new(0)).collect(),
            next: (0..n).map(|_| AtomicU32::new(EMPTY_ID)).collect(),
            buckets: (0..n).map(|_| AtomicU32::new(EMPTY_ID)).collect(),
        }
    }

    /// Double every column and rehash the bucket chains in place. Only ever
    /// called with the storage write lock held.
    fn grow_to(&mut self, new_capacity: u32) {
        let old_top = self.kind.len();
        self.kind.resize_with(new_capacity as usize, || AtomicU8::new(Kind::Hole as u8));
        self.sym.resize_with(new_capacity as usize, || AtomicU8::new(0));
        self.left.resize_with(new_capacity as usize, || AtomicU32::new(EMPTY_ID));
        self.right.resize_with(new_capacity as usize, || AtomicU32::new(EMPTY_ID));
        self.hash.resize_with(new_capacity as usize, || AtomicU32::new(0));
        self.next.resize_with(new_capacity as usize, || AtomicU32::new(EMPTY_ID));
        self.buckets = (0..new_capacity).map(|_| AtomicU32::new(EMPTY_ID)).collect();
        self.capacity = new_capacity;
        self.bucket_mask = new_capacity - 1;

        for id in 0..old_top as u32 {
            if Kind::from_u8(self.kind[id as usize].load(ACQ)) != Kind::NonTerminal {
                continue;
            }
            let h = self.hash[id as usize].load(ACQ);
            let bucket = (h & self.bucket_mask) as usize;
            let head = self.buckets[bucket].load(ACQ);
            self.next[id as usize].store(head, REL);
            self.buckets[bucket].store(id, REL);
        }
    }

    fn slot(&self, id: u32) -> NodeSlot {
        let i = id as usize;
        NodeSlot {
            kind: Kind::from_u8(self.kind[i].load(ACQ)),
            sym: self.sym[i].load(ACQ),
            left: self.left[i].load(ACQ),
            right: self.right[i].load(ACQ),
            hash: self.hash[i].load(ACQ),
        }
    }
}

/// The shared node store for a single evaluator instance.
pub struct Arena {
    storage: RwLock<ArenaStorage>,
    top: AtomicU32,
    term_cache: [AtomicU32; Symbol::ALL.len()],
    stripes: StripeLocks,
    max_capacity: u32,
    resize_seq: AtomicU64,
}

impl Arena {
    pub fn new(config: &Config) -> Self {
        Arena {
            storage: RwLock::new(ArenaStorage::with_capacity(config.initial_capacity())),
            top: AtomicU32::new(0),
            term_cache: std::array::from_fn(|_| AtomicU32::new(EMPTY_ID)),
            stripes: StripeLocks::new(config.bucket_count()),
            max_capacity: config.max_capacity(),
            resize_seq: AtomicU64::new(0),
        }
    }

    /// Number of node ids ever handed out since the last [`Arena::reset`].
    pub fn top(&self) -> u32 {
        self.top.load(ACQ)
    }

    pub fn capacity(&self) -> u32 {
        self.storage.read().capacity
    }

    /// Monotonic counter bumped on every grow, exposed for observability
    /// (mirrors the header's `resizeSeq` field); not load-bearing for
    /// correctness since growth itself is serialized by the storage lock.
    pub fn resize_seq(&self) -> u64 {
        self.resize_seq.load(ACQ)
    }

    pub fn get(&self, id: u32) -> Option<NodeSlot> {
        let storage = self.storage.read();
        if id >= storage.capacity || id >= self.top.load(ACQ) {
            return None;
        }
        Some(storage.slot(id))
    }

    pub fn kind_of(&self, id: u32) -> Kind {
        self.storage.read().slot(id).kind
    }

    pub fn sym_of(&self, id: u32) -> u8 {
        self.storage.read().slot(id).sym
    }

    pub fn left_of(&self, id: u32) -> u32 {
        self.storage.read().slot(id).left
    }

    pub fn right_of(&self, id: u32) -> u32 {
        self.storage.read().slot(id).right
    }

    /// Forget every node. Existing ids become invalid; callers must not
    /// retain ids across a reset.
    pub fn reset(&self) {
        let mut storage = self.storage.write();
        let fresh = ArenaStorage::with_capacity(storage.capacity);
        *storage = fresh;
        self.top.store(0, Ordering::Release);
        for slot in &self.term_cache {
            slot.store(EMPTY_ID, Ordering::Release);
        }
    }

    pub fn alloc_terminal(&self, sym: Symbol) -> Result<u32> {
        let cache_idx = sym as usize - 1;
        let cached = self.term_cache[cache_idx].load(ACQ);
        if cached != EMPTY_ID {
            return Ok(cached);
        }
        let id = self.alloc_generic(Kind::Terminal, sym as u8, EMPTY_ID, EMPTY_ID, sym as u32)?;
        self.term_cache[cache_idx].store(id, REL);
        Ok(id)
    }

    pub fn alloc_continuation(&self, parent: u32, target: u32, stage: u8) -> Result<u32> {
        self.alloc_generic(Kind::Continuation, stage, parent, target, 0)
    }

    pub fn alloc_suspension(&self, curr: u32, stack: u32, sym: u8, remaining_steps: u32) -> Result<u32> {
        self.alloc_generic(Kind::Suspension, sym, curr, stack, remaining_steps)
    }

    /// Overwrite a Continuation frame's fields in place (frame recycling),
    /// instead of allocating a fresh node for every descend step.
    pub fn update_continuation(&self, id: u32, parent: u32, target: u32, stage: u8) {
        let storage = self.storage.read();
        let i = id as usize;
        storage.sym[i].store(stage, REL);
        storage.left[i].store(parent, REL);
        storage.right[i].store(target, REL);
    }

    /// Allocate an application node, deduplicating against any existing
    /// `(left, right)` pair via the content-hash bucket table.
    pub fn alloc_cons(&self, left: u32, right: u32) -> Result<u32> {
        let h = hash::mix(self.hash_of(left), self.hash_of(right));
        loop {
            let found = {
                let storage = self.storage.read();
                let _stripe = self.stripes.lock(h);
                let bucket = (h & storage.bucket_mask) as usize;
                let mut cur = storage.buckets[bucket].load(ACQ);
                let mut found = None;
                while cur != EMPTY_ID {
                    let i = cur as usize;
                    if Kind::from_u8(storage.kind[i].load(ACQ)) == Kind::NonTerminal
                        && storage.left[i].load(ACQ) == left
                        && storage.right[i].load(ACQ) == right
                    {
                        found = Some(cur);
                        break;
                    }
                    cur = storage.next[i].load(ACQ);
                }
                found
            };
            if let Some(id) = found {
                return Ok(id);
            }

            let id = self.alloc_generic(Kind::NonTerminal, 0, left, right, h)?;

            // Re-take the stripe under the same read lock generation used for
            // the id we just got, then link the new node into its bucket.
            let storage = self.storage.read();
            if id >= storage.capacity {
                // a grow raced us between the id allocation and this link;
                // retry the whole lookup/insert against the new layout.
                continue;
            }
            let _stripe = self.stripes.lock(h);
            let bucket = (h & storage.bucket_mask) as usize;
            // Another thread may have inserted the same pair while we were
            // allocating; check once more before linking our (orphaned) node.
            let mut cur = storage.buckets[bucket].load(ACQ);
            while cur != EMPTY_ID {
                let i = cur as usize;
                if storage.left[i].load(ACQ) == left && storage.right[i].load(ACQ) == right {
                    return Ok(cur);
                }
                cur = storage.next[i].load(ACQ);
            }
            let head = storage.buckets[bucket].load(ACQ);
            storage.next[id as usize].store(head, REL);
            storage.buckets[bucket].store(id, REL);
            return Ok(id);
        }
    }

    fn hash_of(&self, id: u32) -> u32 {
        self.storage.read().hash[id as usize].load(ACQ)
    }

    fn alloc_generic(&self, kind: Kind, sym: u8, left: u32, right: u32, hash: u32) -> Result<u32> {
        loop {
            {
                let storage = self.storage.read();
                let cap = storage.capacity;
                let id = self.top.fetch_add(1, AC_REL);
                if id < cap {
                    let i = id as usize;
                    storage.left[i].store(left, REL);
                    storage.right[i].store(right, REL);
                    storage.hash[i].store(hash, REL);
                    storage.sym[i].store(sym, REL);
                    storage.kind[i].store(kind as u8, REL);
                    return Ok(id);
                }
            }
            self.grow()?;
        }
    }

    fn grow(&self) -> Result<()> {
        let mut storage = self.storage.write();
        let top = self.top.load(ACQ);
        let mut new_capacity = storage.capacity;
        while top >= new_capacity {
            new_capacity = new_capacity.checked_mul(2).ok_or(Error::ArenaExhausted)?;
            if new_capacity > self.max_capacity {
                return Err(Error::ArenaExhausted);
            }
        }
        if new_capacity == storage.capacity {
            // someone grew while we waited for the write lock
            return Ok(());
        }
        log::debug!("growing arena from {} to {new_capacity} nodes", storage.capacity);
        storage.grow_to(new_capacity);
        self.resize_seq.fetch_add(1, AC_REL);
        Ok(())
    }
}
