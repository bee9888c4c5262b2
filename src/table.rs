//! Fixed-capacity chained hash table for one join pass.
//!
//! The table never grows: its bucket count is fixed at construction from
//! the caller's memory budget, and crossing the load-factor threshold is a
//! signal to flush the pass, not to resize. All entries are dropped with
//! the table at pass end.

use std::mem;

use crate::error::{Error, Result};
use crate::record::Record;

/// Resident count never exceeds `capacity * LOAD_FACTOR` before the driver
/// flushes the pass.
pub const LOAD_FACTOR: f64 = 0.75;

#[derive(Debug)]
struct Entry {
    key: String,
    record: Record,
}

/// Chained hash map from join-key text to the owning build record.
///
/// Collisions chain within a bucket, new entries appended at the tail;
/// inserting a key already present overwrites its record (last-write-wins),
/// so duplicate keys never coexist.
#[derive(Debug)]
pub struct BoundedTable {
    buckets: Vec<Vec<Entry>>,
    len: usize,
}

impl BoundedTable {
    /// Allocates `capacity` empty buckets. A capacity of zero cannot hold
    /// an entry and is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(Error::BudgetTooSmall {
                budget: 0,
                entry_size: Self::entry_size(),
            });
        }
        let mut buckets = Vec::new();
        buckets.resize_with(capacity, Vec::new);
        Ok(Self { buckets, len: 0 })
    }

    /// Per-entry byte cost used to derive a capacity from a memory budget.
    pub fn entry_size() -> usize {
        mem::size_of::<Entry>()
    }

    /// Bucket count fixed at construction.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest resident count a pass may reach before it must flush:
    /// `floor(capacity * LOAD_FACTOR)`, but never below one entry.
    pub fn max_resident(&self) -> usize {
        let limit = (self.capacity() as f64 * LOAD_FACTOR) as usize;
        limit.max(1)
    }

    pub fn is_at_load_limit(&self) -> bool {
        self.len >= self.max_resident()
    }

    /// Inserts `(key, record)`, taking ownership of both. If the key is
    /// already present its record is replaced and `true` is returned; the
    /// superseded record is dropped here.
    pub fn insert(&mut self, key: String, record: Record) -> bool {
        let bucket = hash(&key) % self.buckets.len();
        let chain = &mut self.buckets[bucket];
        for entry in chain.iter_mut() {
            if entry.key == key {
                entry.record = record;
                return true;
            }
        }
        chain.push(Entry { key, record });
        self.len += 1;
        false
    }

    /// Borrows the record stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Record> {
        let bucket = hash(key) % self.buckets.len();
        self.buckets[bucket]
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.record)
    }
}

/// Jenkins one-at-a-time hash over the key's bytes. Deterministic within a
/// run, which is all a single pass requires.
fn hash(key: &str) -> usize {
    let mut h: usize = 0;
    for &byte in key.as_bytes() {
        h = h.wrapping_add(byte as usize);
        h = h.wrapping_add(h << 10);
        h ^= h >> 6;
    }
    h = h.wrapping_add(h << 3);
    h ^= h >> 11;
    h.wrapping_add(h << 15)
}
