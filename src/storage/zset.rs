//! Sorted set: members ordered by (score, member).
//!
//! Two indices live under one mutex: an [`OrderedIndex`] keyed by
//! [`ScoreKey`] for rank and range queries, and a member→score hash map for
//! O(1) score lookups. Every mutation updates both inside the same critical
//! section, so an observer can never see one index without the matching
//! state in the other.
//!
//! Ties in score order by member bytes ascending, matching Redis. Scores
//! are `f64` with NaN rejected at the boundary; `ordered_float` supplies
//! the total order the tree key needs.

use crate::storage::error::StoreError;
use crate::storage::index::OrderedIndex;
use bytes::Bytes;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

/// Composite ordering key: score first, then member bytes.
///
/// The derived `Ord` is lexicographic over the fields, which is exactly the
/// (score, member) order the rank and range operations are defined over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScoreKey {
    pub score: OrderedFloat<f64>,
    pub member: Bytes,
}

impl ScoreKey {
    fn new(score: f64, member: Bytes) -> Self {
        Self {
            score: OrderedFloat(score),
            member,
        }
    }
}

/// What a `ZADD` did for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAddOutcome {
    /// The member was not present and has been inserted.
    Added,
    /// The member was present with a different score; the score changed.
    Updated,
    /// The member was present with the same score.
    Unchanged,
}

#[derive(Debug, Default)]
struct ZSetInner {
    by_score: OrderedIndex<ScoreKey, Bytes>,
    scores: HashMap<Bytes, f64>,
}

impl ZSetInner {
    /// Both indices must describe the same membership.
    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.by_score.len(), self.scores.len());
        for (member, &score) in &self.scores {
            let key = ScoreKey::new(score, member.clone());
            assert_eq!(
                self.by_score.get(&key),
                Some(member),
                "member missing from the score index"
            );
        }
    }
}

/// An ordered set of unique byte-string members with floating-point scores.
///
/// The handle is shared (`Arc`) between the owning dictionary entry and
/// in-flight operations; interior locking keeps the dual index coherent.
#[derive(Debug, Default)]
pub struct SortedSet {
    inner: Mutex<ZSetInner>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member` with `score`, or moves it to the new score.
    ///
    /// Rejects NaN before touching either index, so a failed add leaves the
    /// set exactly as it was.
    pub fn add(&self, member: Bytes, score: f64) -> Result<ZAddOutcome, StoreError> {
        if score.is_nan() {
            return Err(StoreError::InvalidScore);
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.scores.get(&member).copied() {
            Some(old) if old == score => Ok(ZAddOutcome::Unchanged),
            Some(old) => {
                inner.by_score.remove(&ScoreKey::new(old, member.clone()));
                inner
                    .by_score
                    .insert(ScoreKey::new(score, member.clone()), member.clone());
                inner.scores.insert(member, score);
                Ok(ZAddOutcome::Updated)
            }
            None => {
                inner
                    .by_score
                    .insert(ScoreKey::new(score, member.clone()), member.clone());
                inner.scores.insert(member, score);
                Ok(ZAddOutcome::Added)
            }
        }
    }

    /// Removes a member. Returns `true` iff it was present.
    pub fn remove(&self, member: &Bytes) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.scores.remove(member) {
            Some(score) => {
                inner.by_score.remove(&ScoreKey::new(score, member.clone()));
                true
            }
            None => false,
        }
    }

    /// Score of a member, if present.
    pub fn score(&self, member: &Bytes) -> Option<f64> {
        self.inner.lock().unwrap().scores.get(member).copied()
    }

    /// Zero-based ascending rank of a member.
    pub fn rank(&self, member: &Bytes) -> Option<usize> {
        let inner = self.inner.lock().unwrap();
        let score = *inner.scores.get(member)?;
        inner.by_score.rank_of(&ScoreKey::new(score, member.clone()))
    }

    /// Members whose rank falls in `[start, stop]`, both inclusive.
    ///
    /// Negative indices count from the end (`-1` is the last member).
    /// `start` clamps to the front, `stop` to the back; an inverted window
    /// is empty.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(Bytes, f64)> {
        let inner = self.inner.lock().unwrap();
        let len = inner.by_score.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        if start < 0 {
            start = 0;
        }
        if stop >= len {
            stop = len - 1;
        }
        if start >= len || start > stop {
            return Vec::new();
        }

        let mut out = Vec::with_capacity((stop - start + 1) as usize);
        inner
            .by_score
            .visit_rank_range(start as usize, stop as usize, |key, member| {
                out.push((member.clone(), key.score.0));
            });
        out
    }

    /// Members with `min <= score <= max`, ascending by (score, member).
    ///
    /// The classifier compares scores only, which makes the member bound
    /// open on both ends of the window. `min > max` yields the empty set.
    pub fn range_by_score(&self, min: f64, max: f64) -> Vec<(Bytes, f64)> {
        debug_assert!(!min.is_nan() && !max.is_nan());
        if min > max {
            return Vec::new();
        }
        let inner = self.inner.lock().unwrap();
        inner
            .by_score
            .range_by(|key| {
                if key.score.0 < min {
                    Ordering::Less
                } else if key.score.0 > max {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .into_iter()
            .map(|(key, member)| (member.clone(), key.score.0))
            .collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all members.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.by_score.clear();
        inner.scores.clear();
    }

    /// All (member, score) pairs in ascending (score, member) order.
    pub fn entries(&self) -> Vec<(Bytes, f64)> {
        let inner = self.inner.lock().unwrap();
        inner
            .by_score
            .entries()
            .into_iter()
            .map(|(key, member)| (member.clone(), key.score.0))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.inner.lock().unwrap().assert_consistent();
    }
}
