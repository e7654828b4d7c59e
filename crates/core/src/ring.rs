// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity overwriting ring buffer.

use parking_lot::Mutex;

/// A thread-safe circular queue with a fixed capacity.
///
/// `push` always succeeds: once the queue is full the oldest element is
/// evicted to make room. Readers and writers may call any operation from
/// any thread; `snapshot` returns a self-consistent ordered copy.
pub struct Ring<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    slots: Vec<Option<T>>,
    start: usize,
    length: usize,
}

impl<T> Ring<T> {
    /// Create a ring holding at most `capacity` elements.
    ///
    /// A capacity of zero is bumped to one so that `push` can always store
    /// the most recent element.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ring { inner: Mutex::new(Inner { slots, start: 0, length: 0 }) }
    }

    /// Append an element, evicting the oldest when full.
    pub fn push(&self, element: T) {
        let mut inner = self.inner.lock();
        let capacity = inner.slots.len();
        if inner.length == capacity {
            // Full: the slot at `start` holds the oldest element.
            let start = inner.start;
            inner.slots[start] = Some(element);
            inner.start = (start + 1) % capacity;
        } else {
            let end = (inner.start + inner.length) % capacity;
            inner.slots[end] = Some(element);
            inner.length += 1;
        }
    }

    /// Remove and return the oldest element, or `None` when empty.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        if inner.length == 0 {
            return None;
        }
        let capacity = inner.slots.len();
        let start = inner.start;
        let element = inner.slots[start].take();
        inner.start = (start + 1) % capacity;
        inner.length -= 1;
        element
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of elements the ring can hold.
    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Fold over the elements oldest-first without copying them out.
    pub fn fold<R>(&self, init: R, mut f: impl FnMut(R, &T) -> R) -> R {
        let inner = self.inner.lock();
        let capacity = inner.slots.len();
        let mut acc = init;
        for i in 0..inner.length {
            if let Some(element) = &inner.slots[(inner.start + i) % capacity] {
                acc = f(acc, element);
            }
        }
        acc
    }
}

impl<T: Clone> Ring<T> {
    /// The oldest element without removing it.
    pub fn front(&self) -> Option<T> {
        let inner = self.inner.lock();
        if inner.length == 0 {
            return None;
        }
        inner.slots[inner.start].clone()
    }

    /// Ordered copy of the contents, oldest first.
    ///
    /// Taken under the internal lock, so the view never tears even while
    /// writers are pushing concurrently.
    pub fn snapshot(&self) -> Vec<T> {
        self.fold(Vec::with_capacity(self.len()), |mut acc, element| {
            acc.push(element.clone());
            acc
        })
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
