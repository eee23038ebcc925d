use parking_lot::{Mutex, MutexGuard};

use super::cache_pad::CachePadded;

/// A fixed bank of mutexes indexed by `hash % len`, so bucket-chain mutation
/// only serializes threads that land on the same stripe rather than the
/// whole table.
pub struct StripeLocks {
    stripes: Vec<CachePadded<Mutex<()>>>,
}

impl StripeLocks {
    /// `count` must be a power of two so [`StripeLocks::lock`] can mask
    /// instead of taking a modulo.
    pub fn new(count: u32) -> Self {
        debug_assert!(count.is_power_of_two());
        let stripes = (0..count).map(|_| CachePadded::new(Mutex::new(()))).collect();
        StripeLocks { stripes }
    }

    pub fn len(&self) -> u32 {
        self.stripes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }

    /// Lock the stripe a given content hash falls into.
    pub fn lock(&self, hash: u32) -> MutexGuard<'_, ()> {
        let mask = self.len() - 1;
        self.stripes[(hash & mask) as usize].lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_hash_serializes_distinct_hashes_dont_share_a_guard() {
        let locks = StripeLocks::new(8);
        let _g0 = locks.lock(0);
        let _g1 = locks.lock(1);
    }

    #[test]
    fn masks_wrap_around_stripe_count() {
        let locks = StripeLocks::new(4);
        let _g = locks.lock(4);
    }
}
