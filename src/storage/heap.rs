//! Expiry scheduler: an indexed binary min-heap of (key, deadline) pairs.
//!
//! The heap array is ordered by deadline; a side map records each key's
//! current array index so updating or deleting an arbitrary key stays
//! O(log n) instead of requiring a scan. Every swap of two array slots also
//! swaps the two map entries, keeping the array and the map a bijection at
//! all times.
//!
//! The expiry worker asks [`ExpiryScheduler::peek`] for its next sleep
//! deadline and [`ExpiryScheduler::drain_expired`] for the keys to purge
//! once it wakes.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone)]
struct HeapEntry {
    key: Bytes,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct HeapInner {
    heap: Vec<HeapEntry>,
    pos: HashMap<Bytes, usize>,
}

impl HeapInner {
    /// Swaps two heap slots and keeps the position map in step.
    fn swap_slots(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos.insert(self.heap[i].key.clone(), i);
        self.pos.insert(self.heap[j].key.clone(), j);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i].expires_at < self.heap[parent].expires_at {
                self.swap_slots(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < len && self.heap[left].expires_at < self.heap[smallest].expires_at {
                smallest = left;
            }
            if right < len && self.heap[right].expires_at < self.heap[smallest].expires_at {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap_slots(i, smallest);
            i = smallest;
        }
    }

    /// Pops the root, returning its key. The caller has checked non-empty.
    fn pop_root(&mut self) -> Bytes {
        let last = self.heap.len() - 1;
        self.swap_slots(0, last);
        let entry = self.heap.pop().expect("pop_root on an empty heap");
        self.pos.remove(&entry.key);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        entry.key
    }

    /// Heap order plus position-map bijection. Test-only.
    #[cfg(test)]
    fn assert_invariants(&self) {
        assert_eq!(self.heap.len(), self.pos.len());
        for (i, entry) in self.heap.iter().enumerate() {
            if i > 0 {
                let parent = (i - 1) / 2;
                assert!(
                    self.heap[parent].expires_at <= entry.expires_at,
                    "heap order violated at index {i}"
                );
            }
            assert_eq!(
                self.pos.get(&entry.key),
                Some(&i),
                "position map out of step at index {i}"
            );
        }
    }
}

/// Tracks which keys have deadlines and which deadline comes first.
#[derive(Debug, Default)]
pub struct ExpiryScheduler {
    inner: Mutex<HeapInner>,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `expires_at` for `key`, replacing any existing deadline.
    ///
    /// An existing key is updated in place and sifted in whichever
    /// direction the new deadline requires; a new key is pushed at the tail
    /// and sifted up.
    pub fn upsert(&self, key: Bytes, expires_at: Instant) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&i) = inner.pos.get(&key) {
            inner.heap[i].expires_at = expires_at;
            inner.sift_up(i);
            inner.sift_down(i);
        } else {
            inner.heap.push(HeapEntry {
                key: key.clone(),
                expires_at,
            });
            let i = inner.heap.len() - 1;
            inner.pos.insert(key, i);
            inner.sift_up(i);
        }
    }

    /// Deregisters a key. Returns `true` iff it had a deadline.
    ///
    /// The vacated slot is filled by the tail entry, which may need to move
    /// either way: down if it is larger than its new children, up if it is
    /// smaller than its new parent.
    pub fn remove(&self, key: &Bytes) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(&i) = inner.pos.get(key) else {
            return false;
        };
        let last = inner.heap.len() - 1;
        inner.swap_slots(i, last);
        inner.heap.pop();
        inner.pos.remove(key);
        if i < inner.heap.len() {
            inner.sift_down(i);
            inner.sift_up(i);
        }
        true
    }

    /// Pops every key whose deadline is at or before `now`, in
    /// non-decreasing deadline order. Afterwards the earliest remaining
    /// deadline, if any, is strictly after `now`.
    pub fn drain_expired(&self, now: Instant) -> Vec<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        let mut expired = Vec::new();
        while let Some(root) = inner.heap.first() {
            if root.expires_at > now {
                break;
            }
            expired.push(inner.pop_root());
        }
        expired
    }

    /// Copy of the earliest deadline, so callers can compute a timeout
    /// without holding the scheduler lock across a wait.
    pub fn peek(&self) -> Option<Instant> {
        self.inner
            .lock()
            .unwrap()
            .heap
            .first()
            .map(|entry| entry.expires_at)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.heap.clear();
        inner.pos.clear();
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.inner.lock().unwrap().assert_invariants();
    }
}
