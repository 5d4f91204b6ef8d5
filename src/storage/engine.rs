//! The storage engine: keyed dictionary, expiry scheduling, sorted sets.
//!
//! One engine instance backs every connection. The dictionary, each sorted
//! set, and the expiry scheduler carry their own mutex; engine methods
//! acquire them in dictionary → sorted-set → scheduler order and release
//! each before taking the next, so no two are ever held together. The one
//! exception is the create-on-first-`ZADD` path, which briefly holds the
//! dictionary and the freshly created set in that order. Critical sections
//! never perform I/O and never await.
//!
//! Expiry is handled twice over:
//! - lazily: any read that finds a due entry deletes it on the spot;
//! - actively: the background worker (see [`crate::storage::expiry`])
//!   drains the scheduler and purges keys nobody is reading.
//!
//! A key is due once `now >= expires_at`. Deadlines are monotonic
//! [`Instant`]s, unaffected by wall-clock adjustments.

use crate::storage::dict::Dict;
use crate::storage::error::StoreError;
use crate::storage::heap::ExpiryScheduler;
use crate::storage::value::{Entry, Value};
use crate::storage::zset::{SortedSet, ZAddOutcome};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// TTL answer for a key that does not exist.
pub const TTL_MISSING: i64 = -2;
/// TTL answer for a key that exists without an expiry.
pub const TTL_PERSISTENT: i64 = -1;

/// The in-memory data plane behind every command.
///
/// Designed to be wrapped in an `Arc` and shared across connection tasks
/// and the expiry worker; all methods take `&self`.
#[derive(Debug)]
pub struct StorageEngine {
    dict: Mutex<Dict>,
    scheduler: ExpiryScheduler,
    /// Wakes the expiry worker when an operation shortens (or creates) the
    /// earliest deadline. `Notify` buffers one permit, so a notification
    /// sent before the worker reaches its wait is not lost.
    wake: Notify,
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    pub fn new() -> Self {
        Self {
            dict: Mutex::new(Dict::new()),
            scheduler: ExpiryScheduler::new(),
            wake: Notify::new(),
        }
    }

    // ------------------------------------------------------------------
    // String operations
    // ------------------------------------------------------------------

    /// Unconditional write. Clears any prior expiry and drops whatever
    /// value (sorted set included) the key held before.
    pub fn set(&self, key: Bytes, value: Bytes) {
        let now = Instant::now();
        self.dict
            .lock()
            .unwrap()
            .insert(key.clone(), Entry::new(Value::String(value)), now);
        self.scheduler.remove(&key);
    }

    /// Writes only if the key is absent (a due entry counts as absent).
    /// Returns whether the write happened.
    pub fn setnx(&self, key: Bytes, value: Bytes) -> bool {
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();
        if let Some(entry) = dict.get(&key) {
            if !entry.is_expired_at(now) {
                return false;
            }
            dict.remove(&key);
        }
        dict.insert(key.clone(), Entry::new(Value::String(value)), now);
        drop(dict);
        // the overwritten entry may still be registered
        self.scheduler.remove(&key);
        true
    }

    /// Unconditional write with an absolute expiry of `now + ttl`.
    /// Registers the deadline and wakes the worker.
    pub fn setex(&self, key: Bytes, value: Bytes, ttl: Duration) {
        let now = Instant::now();
        let deadline = now + ttl;
        self.dict.lock().unwrap().insert(
            key.clone(),
            Entry::with_expiry(Value::String(value), deadline),
            now,
        );
        self.scheduler.upsert(key, deadline);
        self.wake.notify_one();
    }

    /// String form of the value, or `None` when the key is absent or due.
    /// A due entry found here is deleted on the spot.
    pub fn get(&self, key: &Bytes) -> Result<Option<Bytes>, StoreError> {
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();
        match dict.get(key) {
            None => Ok(None),
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(key);
                drop(dict);
                self.scheduler.remove(key);
                Ok(None)
            }
            Some(entry) => entry
                .value
                .as_string()
                .map(Some)
                .ok_or(StoreError::WrongType),
        }
    }

    /// Removes a key. Returns whether anything was deleted.
    pub fn del(&self, key: &Bytes) -> bool {
        let removed = self.dict.lock().unwrap().remove(key).is_some();
        if removed {
            self.scheduler.remove(key);
        }
        removed
    }

    /// Whether the key exists and is not due. Deletes lazily when due.
    pub fn exists(&self, key: &Bytes) -> bool {
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();
        match dict.get(key) {
            None => false,
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(key);
                drop(dict);
                self.scheduler.remove(key);
                false
            }
            Some(_) => true,
        }
    }

    /// Sets the expiry of an existing key to `now + ttl` and wakes the
    /// worker. Returns `false` when the key is absent (or was due).
    /// A zero `ttl` is legal and means the next worker pass deletes it.
    pub fn expire(&self, key: &Bytes, ttl: Duration) -> bool {
        let now = Instant::now();
        let deadline = now + ttl;
        let mut dict = self.dict.lock().unwrap();
        match dict.get_mut(key) {
            None => false,
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(key);
                drop(dict);
                self.scheduler.remove(key);
                false
            }
            Some(entry) => {
                entry.expires_at = Some(deadline);
                drop(dict);
                self.scheduler.upsert(key.clone(), deadline);
                self.wake.notify_one();
                true
            }
        }
    }

    /// Remaining whole seconds before expiry: [`TTL_MISSING`] when absent,
    /// [`TTL_PERSISTENT`] when the key has no deadline.
    pub fn ttl(&self, key: &Bytes) -> i64 {
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();
        match dict.get(key) {
            None => TTL_MISSING,
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(key);
                drop(dict);
                self.scheduler.remove(key);
                TTL_MISSING
            }
            Some(entry) => match entry.expires_at {
                None => TTL_PERSISTENT,
                Some(deadline) => deadline.duration_since(now).as_secs() as i64,
            },
        }
    }

    /// Number of keys, including due entries not yet purged.
    pub fn dbsize(&self) -> usize {
        self.dict.lock().unwrap().len()
    }

    /// Drops everything: all entries and all scheduled deadlines.
    pub fn flushdb(&self) {
        self.dict.lock().unwrap().clear();
        self.scheduler.clear();
    }

    // ------------------------------------------------------------------
    // Integer arithmetic
    // ------------------------------------------------------------------

    /// Adds `delta` to the integer stored at `key`, creating it at zero
    /// when absent. The entry keeps its expiry. Fails on non-integer
    /// values and on overflow.
    pub fn incr_by(&self, key: &Bytes, delta: i64) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();

        let (current, expires_at) = match dict.get(key) {
            None => (0, None),
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(key);
                (0, None)
            }
            Some(entry) => {
                let parsed = match &entry.value {
                    Value::Integer(n) => *n,
                    Value::String(raw) => std::str::from_utf8(raw)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or(StoreError::NotAnInteger)?,
                    Value::SortedSet(_) => return Err(StoreError::WrongType),
                };
                (parsed, entry.expires_at)
            }
        };

        let next = current
            .checked_add(delta)
            .ok_or(StoreError::IntegerOverflow)?;
        dict.insert(
            key.clone(),
            Entry {
                value: Value::Integer(next),
                expires_at,
            },
            now,
        );
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Sorted-set operations
    // ------------------------------------------------------------------

    /// Adds or rescores one member of the sorted set at `key`, creating
    /// the set when the key is absent.
    pub fn zadd(&self, key: Bytes, member: Bytes, score: f64) -> Result<ZAddOutcome, StoreError> {
        if score.is_nan() {
            return Err(StoreError::InvalidScore);
        }
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();
        match dict.get(&key) {
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(&key);
                let set = Arc::new(SortedSet::new());
                let outcome = set.add(member, score);
                dict.insert(key.clone(), Entry::new(Value::SortedSet(set)), now);
                drop(dict);
                self.scheduler.remove(&key);
                outcome
            }
            Some(entry) => match entry.value.as_sorted_set() {
                Some(set) => {
                    let set = Arc::clone(set);
                    drop(dict);
                    set.add(member, score)
                }
                None => Err(StoreError::WrongType),
            },
            None => {
                // sanctioned double-lock path: dictionary, then the new set
                let set = Arc::new(SortedSet::new());
                let outcome = set.add(member, score);
                dict.insert(key, Entry::new(Value::SortedSet(set)), now);
                outcome
            }
        }
    }

    /// Removes a member. `false` when either the key or the member is
    /// missing. Removing the last member keeps the (now empty) set alive.
    pub fn zrem(&self, key: &Bytes, member: &Bytes) -> Result<bool, StoreError> {
        match self.sorted_set(key)? {
            Some(set) => Ok(set.remove(member)),
            None => Ok(false),
        }
    }

    pub fn zscore(&self, key: &Bytes, member: &Bytes) -> Result<Option<f64>, StoreError> {
        match self.sorted_set(key)? {
            Some(set) => Ok(set.score(member)),
            None => Ok(None),
        }
    }

    pub fn zrank(&self, key: &Bytes, member: &Bytes) -> Result<Option<usize>, StoreError> {
        match self.sorted_set(key)? {
            Some(set) => Ok(set.rank(member)),
            None => Ok(None),
        }
    }

    /// Rank-window query; indices may be negative (counted from the end).
    pub fn zrange(
        &self,
        key: &Bytes,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(Bytes, f64)>, StoreError> {
        match self.sorted_set(key)? {
            Some(set) => Ok(set.range_by_rank(start, stop)),
            None => Ok(Vec::new()),
        }
    }

    /// Inclusive score-window query.
    pub fn zrangebyscore(
        &self,
        key: &Bytes,
        min: f64,
        max: f64,
    ) -> Result<Vec<(Bytes, f64)>, StoreError> {
        match self.sorted_set(key)? {
            Some(set) => Ok(set.range_by_score(min, max)),
            None => Ok(Vec::new()),
        }
    }

    pub fn zcard(&self, key: &Bytes) -> Result<usize, StoreError> {
        match self.sorted_set(key)? {
            Some(set) => Ok(set.len()),
            None => Ok(0),
        }
    }

    /// Clones the sorted-set handle at `key` so the caller can operate on
    /// it after the dictionary lock is gone. `None` for absent (or due)
    /// keys; `WrongType` when the key holds something else.
    fn sorted_set(&self, key: &Bytes) -> Result<Option<Arc<SortedSet>>, StoreError> {
        let now = Instant::now();
        let mut dict = self.dict.lock().unwrap();
        match dict.get(key) {
            None => Ok(None),
            Some(entry) if entry.is_expired_at(now) => {
                dict.remove(key);
                drop(dict);
                self.scheduler.remove(key);
                Ok(None)
            }
            Some(entry) => match entry.value.as_sorted_set() {
                Some(set) => Ok(Some(Arc::clone(set))),
                None => Err(StoreError::WrongType),
            },
        }
    }

    // ------------------------------------------------------------------
    // Expiry plumbing (used by the background worker)
    // ------------------------------------------------------------------

    /// Drains every due deadline and deletes the corresponding keys.
    ///
    /// A drained key is only deleted if its entry is still due: a racing
    /// write may have replaced the entry (and cleared or extended its
    /// expiry) between the drain and the delete, and that write wins.
    /// Returns the number of keys actually deleted.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let due = self.scheduler.drain_expired(now);
        let mut purged = 0;
        for key in due {
            let mut dict = self.dict.lock().unwrap();
            if let Some(entry) = dict.get(&key) {
                if entry.is_expired_at(now) {
                    dict.remove(&key);
                    purged += 1;
                }
            }
        }
        purged
    }

    /// Copy of the earliest scheduled deadline, for the worker's timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.peek()
    }

    /// Resolves when an operation signals a new or shortened deadline.
    pub(crate) async fn deadline_changed(&self) {
        self.wake.notified().await;
    }

    #[cfg(test)]
    pub(crate) fn scheduled_deadlines(&self) -> usize {
        self.scheduler.len()
    }
}
