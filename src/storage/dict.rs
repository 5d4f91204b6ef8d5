//! Keyed dictionary: a separate-chaining hash table.
//!
//! Buckets hold boxed singly-linked chains searched linearly by key
//! equality. The table doubles when the load factor passes 3/4; rehashing
//! takes the current instant so entries that are already due for expiry
//! are dropped instead of being carried into the new bucket array.
//!
//! This structure is not synchronized; the storage engine wraps it in its
//! own mutex.

use crate::storage::value::Entry;
use bytes::Bytes;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

/// Bucket count for a fresh table. Grows by doubling, so powers of two
/// keep the modulo cheap.
const INITIAL_BUCKETS: usize = 16;

struct ChainNode {
    key: Bytes,
    entry: Entry,
    next: Option<Box<ChainNode>>,
}

/// Hash table mapping keys to [`Entry`] records.
pub struct Dict {
    buckets: Vec<Option<Box<ChainNode>>>,
    len: usize,
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

impl Dict {
    pub fn new() -> Self {
        Self {
            buckets: (0..INITIAL_BUCKETS).map(|_| None).collect(),
            len: 0,
        }
    }

    /// Number of stored entries, counting entries whose expiry has passed
    /// but which have not been purged yet.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every entry, keeping the current bucket array.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = None;
        }
        self.len = 0;
    }

    #[inline]
    fn bucket_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.buckets.len()
    }

    /// Inserts or replaces the entry under `key`, returning the previous
    /// entry if one existed. `now` feeds the resize path so a triggered
    /// rehash can drop entries that are already due.
    pub fn insert(&mut self, key: Bytes, entry: Entry, now: Instant) -> Option<Entry> {
        let idx = self.bucket_index(&key);
        let mut cur = &mut self.buckets[idx];
        loop {
            match cur {
                None => {
                    *cur = Some(Box::new(ChainNode {
                        key,
                        entry,
                        next: None,
                    }));
                    self.len += 1;
                    self.maybe_grow(now);
                    return None;
                }
                Some(node) if node.key == key => {
                    return Some(std::mem::replace(&mut node.entry, entry));
                }
                Some(node) => cur = &mut node.next,
            }
        }
    }

    /// Looks up the entry under `key` without touching expiry state.
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        let mut cur = self.buckets[self.bucket_index(key)].as_deref();
        while let Some(node) = cur {
            if node.key == key {
                return Some(&node.entry);
            }
            cur = node.next.as_deref();
        }
        None
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Entry> {
        let idx = self.bucket_index(key);
        let mut cur = self.buckets[idx].as_deref_mut();
        while let Some(node) = cur {
            if node.key == key {
                return Some(&mut node.entry);
            }
            cur = node.next.as_deref_mut();
        }
        None
    }

    /// Unlinks and returns the entry under `key`.
    pub fn remove(&mut self, key: &[u8]) -> Option<Entry> {
        let idx = self.bucket_index(key);
        let mut cur = &mut self.buckets[idx];
        loop {
            let found = match cur {
                None => return None,
                Some(node) => node.key == key,
            };
            if found {
                let node = cur.take().expect("matched arm guarantees a node");
                *cur = node.next;
                self.len -= 1;
                return Some(node.entry);
            }
            cur = match cur {
                Some(node) => &mut node.next,
                None => return None,
            };
        }
    }

    fn maybe_grow(&mut self, now: Instant) {
        // load factor > 3/4
        if self.len * 4 > self.buckets.len() * 3 {
            self.rehash(self.buckets.len() * 2, now);
        }
    }

    fn rehash(&mut self, new_count: usize, now: Instant) {
        let old = std::mem::replace(&mut self.buckets, (0..new_count).map(|_| None).collect());
        self.len = 0;
        for mut slot in old {
            while let Some(mut node) = slot {
                slot = node.next.take();
                if !node.entry.is_expired_at(now) {
                    self.relink(node);
                }
            }
        }
    }

    /// Re-inserts a detached node at the head of its new bucket. Only used
    /// during rehash, where keys are already known to be unique.
    fn relink(&mut self, mut node: Box<ChainNode>) {
        let idx = self.bucket_index(&node.key);
        node.next = self.buckets[idx].take();
        self.buckets[idx] = Some(node);
        self.len += 1;
    }
}

impl std::fmt::Debug for Dict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dict")
            .field("len", &self.len)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::value::Value;
    use std::time::Duration;

    fn string_entry(s: &str) -> Entry {
        Entry::new(Value::String(Bytes::from(s.to_string())))
    }

    fn value_of(entry: &Entry) -> Bytes {
        entry.value.as_string().unwrap()
    }

    #[test]
    fn insert_get_remove() {
        let mut dict = Dict::new();
        let now = Instant::now();

        assert!(dict.insert(Bytes::from("a"), string_entry("1"), now).is_none());
        assert_eq!(dict.len(), 1);
        assert_eq!(value_of(dict.get(b"a").unwrap()), Bytes::from("1"));

        let old = dict.insert(Bytes::from("a"), string_entry("2"), now).unwrap();
        assert_eq!(value_of(&old), Bytes::from("1"));
        assert_eq!(dict.len(), 1);

        assert!(dict.remove(b"a").is_some());
        assert!(dict.remove(b"a").is_none());
        assert!(dict.is_empty());
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut dict = Dict::new();
        let now = Instant::now();
        dict.insert(Bytes::from("k"), string_entry("v"), now);

        let entry = dict.get_mut(b"k").unwrap();
        entry.expires_at = Some(now + Duration::from_secs(5));
        assert!(dict.get(b"k").unwrap().expires_at.is_some());
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut dict = Dict::new();
        let now = Instant::now();
        for i in 0..500 {
            dict.insert(Bytes::from(format!("key:{i}")), string_entry("v"), now);
        }
        assert_eq!(dict.len(), 500);
        for i in 0..500 {
            assert!(
                dict.get(format!("key:{i}").as_bytes()).is_some(),
                "key:{i} lost during resize"
            );
        }
    }

    #[test]
    fn rehash_drops_expired_entries() {
        let mut dict = Dict::new();
        let now = Instant::now();

        // a batch of entries that are already due
        for i in 0..6 {
            let entry = Entry::with_expiry(
                Value::String(Bytes::from("gone")),
                now - Duration::from_millis(1),
            );
            dict.insert(Bytes::from(format!("dead:{i}")), entry, now);
        }
        // push the load factor over the threshold with live entries
        for i in 0..20 {
            dict.insert(Bytes::from(format!("live:{i}")), string_entry("v"), now);
        }

        for i in 0..20 {
            assert!(dict.get(format!("live:{i}").as_bytes()).is_some());
        }
        // the resize that accommodated the live entries rehashed without
        // the due ones
        assert!(dict.len() < 26);
    }

    #[test]
    fn clear_keeps_working_after() {
        let mut dict = Dict::new();
        let now = Instant::now();
        dict.insert(Bytes::from("a"), string_entry("1"), now);
        dict.clear();
        assert!(dict.is_empty());
        assert!(dict.get(b"a").is_none());

        dict.insert(Bytes::from("b"), string_entry("2"), now);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn colliding_keys_share_a_chain() {
        // many keys, few buckets before any growth: collisions guaranteed
        let mut dict = Dict::new();
        let now = Instant::now();
        for i in 0..INITIAL_BUCKETS {
            dict.insert(Bytes::from(format!("{i}")), string_entry("v"), now);
        }
        // every key must still resolve through linear chain search
        for i in 0..INITIAL_BUCKETS {
            assert!(dict.get(format!("{i}").as_bytes()).is_some());
        }
        // and removal must relink the chain correctly
        for i in 0..INITIAL_BUCKETS {
            assert!(dict.remove(format!("{i}").as_bytes()).is_some());
        }
        assert!(dict.is_empty());
    }
}
