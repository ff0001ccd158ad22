//! Fixed-capacity ordered log.
//!
//! Eviction happens inside the mutating call, so the store never holds more
//! than `capacity` items once an operation returns.

use std::collections::VecDeque;

/// Bounded, insertion-ordered collection.
///
/// `append` keeps chronological order (oldest evicted from the front),
/// `prepend` keeps newest-first order (oldest evicted from the back). A given
/// store should be used with one of the two.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Create an empty log. Capacity never changes afterwards.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add to the end, evicting from the front.
    pub fn append(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Add to the front, evicting from the back.
    pub fn prepend(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_back();
        }
        self.items.push_front(item);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Front-to-back iterator.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Most recently inserted item for an append-ordered log.
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Most recently inserted item for a prepend-ordered log.
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Owned copy of the contents, front to back.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
