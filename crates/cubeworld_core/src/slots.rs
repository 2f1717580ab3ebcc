//! Free-list of plot slots.

use crate::types::SlotIndex;
use std::collections::BTreeSet;
use tracing::warn;

/// Pool of slot indices available to joining members.
///
/// Indices below `next_fresh` have been handed out at least once; the ones
/// among them that came back sit in `released`. Memory therefore follows the
/// number of slots in use, not the capacity. [`SlotPool::acquire`] always
/// hands out the smallest free index, so released slots are reused before
/// fresh ones.
#[derive(Debug, Clone)]
pub struct SlotPool {
    released: BTreeSet<SlotIndex>,
    next_fresh: SlotIndex,
    capacity: SlotIndex,
}

impl SlotPool {
    /// Creates a pool holding `0..capacity`.
    pub fn new(capacity: SlotIndex) -> Self {
        Self {
            released: BTreeSet::new(),
            next_fresh: 0,
            capacity,
        }
    }

    /// Takes the smallest free index, or `None` when every slot is in use.
    pub fn acquire(&mut self) -> Option<SlotIndex> {
        if let Some(index) = self.released.pop_first() {
            return Some(index);
        }
        if self.next_fresh < self.capacity {
            let index = self.next_fresh;
            self.next_fresh += 1;
            return Some(index);
        }
        None
    }

    /// Returns an index to the pool.
    ///
    /// Releasing an index outside the pool's range or one that is not held
    /// indicates a bookkeeping slip upstream; it is logged and ignored.
    pub fn release(&mut self, index: SlotIndex) {
        if index >= self.capacity {
            warn!("⚠️ Ignoring release of slot {} outside capacity {}", index, self.capacity);
            return;
        }
        if index >= self.next_fresh || !self.released.insert(index) {
            warn!("⚠️ Ignoring release of slot {} that is not held", index);
            return;
        }

        // Fold a free tail back into the fresh range.
        while self.next_fresh > 0 && self.released.remove(&(self.next_fresh - 1)) {
            self.next_fresh -= 1;
        }
    }

    pub fn is_free(&self, index: SlotIndex) -> bool {
        index < self.capacity && (index >= self.next_fresh || self.released.contains(&index))
    }

    /// Number of slots that can still be acquired.
    pub fn available(&self) -> usize {
        (self.capacity - self.next_fresh) as usize + self.released.len()
    }

    pub fn capacity(&self) -> SlotIndex {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_lowest_first() {
        let mut pool = SlotPool::new(3);
        assert_eq!(pool.acquire(), Some(0));
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.acquire(), None);
    }

    #[test]
    fn released_slots_are_reused_in_index_order() {
        let mut pool = SlotPool::new(12);
        let taken: Vec<_> = (0..12).filter_map(|_| pool.acquire()).collect();
        assert_eq!(taken.len(), 12);

        // Numeric ordering, so 10 does not sort before 2.
        pool.release(10);
        pool.release(2);
        pool.release(7);
        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.acquire(), Some(7));
        assert_eq!(pool.acquire(), Some(10));
    }

    #[test]
    fn invalid_releases_are_ignored() {
        let mut pool = SlotPool::new(2);
        pool.release(0);
        pool.release(5);
        assert_eq!(pool.available(), 2);
        assert!(!pool.is_free(5));

        let slot = pool.acquire().unwrap();
        pool.release(slot);
        pool.release(slot);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn huge_capacity_is_allocated_lazily() {
        let mut pool = SlotPool::new(SlotIndex::MAX);
        assert_eq!(pool.available(), SlotIndex::MAX as usize);
        assert!(pool.is_free(SlotIndex::MAX - 1));

        assert_eq!(pool.acquire(), Some(0));
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
        assert_eq!(pool.available(), SlotIndex::MAX as usize - 3);

        pool.release(1);
        assert!(pool.is_free(1));
        assert!(!pool.is_free(2));
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(3));
    }

    #[test]
    fn releasing_the_top_slots_shrinks_the_pool_state() {
        let mut pool = SlotPool::new(8);
        for _ in 0..4 {
            pool.acquire();
        }
        pool.release(1);
        pool.release(3);
        pool.release(2);
        assert_eq!(pool.available(), 7);
        assert!((1..8).all(|index| pool.is_free(index)));
        assert!(!pool.is_free(0));

        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
    }

    #[test]
    fn zero_capacity_pool_is_always_exhausted() {
        let mut pool = SlotPool::new(0);
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.acquire(), None);
    }
}
