//! Concurrent fixed-capacity unique node table
//!
//! The table interns two-word node records: equal records receive equal
//! indices, which is what makes edge comparison decide diagram equality.
//! Records are written once and never mutated; reclamation happens through
//! mark-and-sweep. The mark bitmap lives here (not in the records), and
//! [`UniqueTable::rebuild`] re-hashes every marked record *at its existing
//! index*, so surviving edges stay valid across collections.
//!
//! Concurrency model: `lookup_or_insert` may be called from any number of
//! threads. `rebuild` requires external quiescence (the engine runs it
//! under its collection barrier).

use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use hydd_core::{Node, MAX_NODE_INDEX};
use rustc_hash::FxHasher;

/// Indices 0 and 1 are the False/True sentinels; they are never allocated,
/// hashed, or reclaimed.
pub const FIRST_NODE_INDEX: u64 = 2;

/// Probe-sequence length for concurrent insertion; a record that cannot be
/// placed within this window reports the table as full.
const PROBE_LIMIT: usize = 128;

struct Record {
    a: AtomicU64,
    b: AtomicU64,
}

/// Concurrent hash set of node records with stable indices
pub struct UniqueTable {
    /// Hash part: 0 = empty, otherwise a data index (sentinels excluded, so
    /// every valid entry is ≥ [`FIRST_NODE_INDEX`])
    buckets: Box<[AtomicU64]>,
    mask: usize,
    /// Index-stable storage, written once before an index is published
    data: Box<[Record]>,
    marks: Box<[AtomicU64]>,
    /// Bump allocator over never-used slots
    next: AtomicU64,
    /// Slots reclaimed by the last rebuild
    free: Mutex<Vec<u64>>,
}

impl UniqueTable {
    /// Table for up to `capacity` records (rounded up to a power of two,
    /// capped at 2³³ — the index width of packed child edges)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity
            .max(16)
            .next_power_of_two()
            .min((MAX_NODE_INDEX + 1) as usize);
        // Twice as many buckets as records keeps the probe sequences short.
        let buckets = capacity * 2;
        UniqueTable {
            buckets: std::iter::repeat_with(|| AtomicU64::new(0))
                .take(buckets)
                .collect(),
            mask: buckets - 1,
            data: std::iter::repeat_with(|| Record {
                a: AtomicU64::new(0),
                b: AtomicU64::new(0),
            })
            .take(capacity)
            .collect(),
            marks: std::iter::repeat_with(|| AtomicU64::new(0))
                .take(capacity.div_ceil(64))
                .collect(),
            next: AtomicU64::new(FIRST_NODE_INDEX),
            free: Mutex::new(Vec::new()),
        }
    }

    /// Number of record slots (including the two reserved sentinels)
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// One past the highest index ever allocated; every valid index is
    /// below this bound (useful to size visited sets)
    pub fn high_water(&self) -> u64 {
        self.next
            .load(Ordering::Relaxed)
            .min(self.data.len() as u64)
    }

    /// Number of live record slots (including the two reserved sentinels)
    pub fn occupied(&self) -> usize {
        let bumped = self.next.load(Ordering::Relaxed) as usize;
        bumped - self.free.lock().unwrap().len()
    }

    fn hash(a: u64, b: u64) -> usize {
        let mut h = FxHasher::default();
        h.write_u64(a);
        h.write_u64(b);
        h.finish() as usize
    }

    fn alloc(&self) -> Option<u64> {
        if let Some(idx) = self.free.lock().unwrap().pop() {
            return Some(idx);
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        if idx < self.data.len() as u64 {
            Some(idx)
        } else {
            // Undo so `occupied` stays meaningful; the counter may transiently
            // exceed the capacity under contention, which is harmless.
            self.next.fetch_sub(1, Ordering::Relaxed);
            None
        }
    }

    /// Intern `(a, b)`: the index of an existing equal record, or a fresh
    /// slot. Returns the index and whether the record was created, or
    /// `None` when the table is exhausted (time for a collection).
    pub fn lookup_or_insert(&self, a: u64, b: u64) -> Option<(u64, bool)> {
        let start = Self::hash(a, b);
        let mut claimed = None;
        let mut result = None;

        'probe: for i in 0..PROBE_LIMIT {
            let bucket = &self.buckets[(start + i) & self.mask];
            let mut current = bucket.load(Ordering::Acquire);
            if current == 0 {
                let idx = match claimed {
                    Some(idx) => idx,
                    None => match self.alloc() {
                        Some(idx) => {
                            let record = &self.data[idx as usize];
                            record.a.store(a, Ordering::Relaxed);
                            record.b.store(b, Ordering::Relaxed);
                            claimed = Some(idx);
                            idx
                        }
                        // Allocation exhausted. An equal record never lives
                        // beyond the first empty bucket of its probe
                        // sequence, so there is nothing left to find.
                        None => break,
                    },
                };
                match bucket.compare_exchange(0, idx, Ordering::AcqRel, Ordering::Acquire) {
                    Ok(_) => return Some((idx, true)),
                    Err(raced) => current = raced,
                }
            }
            let record = &self.data[current as usize];
            if record.a.load(Ordering::Relaxed) == a && record.b.load(Ordering::Relaxed) == b {
                result = Some((current, false));
                break 'probe;
            }
        }

        if let Some(idx) = claimed {
            self.free.lock().unwrap().push(idx);
        }
        result
    }

    /// Read the record at `index`
    pub fn node(&self, index: u64) -> Node {
        debug_assert!(index >= FIRST_NODE_INDEX && index < self.next.load(Ordering::Relaxed));
        let record = &self.data[index as usize];
        Node::from_words(
            record.a.load(Ordering::Relaxed),
            record.b.load(Ordering::Relaxed),
        )
    }

    /// Set the mark bit; true if the record was newly marked
    pub fn mark(&self, index: u64) -> bool {
        let bit = 1u64 << (index % 64);
        self.marks[(index / 64) as usize].fetch_or(bit, Ordering::Relaxed) & bit == 0
    }

    pub fn is_marked(&self, index: u64) -> bool {
        self.marks[(index / 64) as usize].load(Ordering::Relaxed) & (1 << (index % 64)) != 0
    }

    pub fn count_marked(&self) -> usize {
        self.marks
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Sweep phase: re-hash every marked record at its existing index,
    /// reclaim every unmarked slot, clear all marks.
    ///
    /// Requires external quiescence: no concurrent `lookup_or_insert` or
    /// `node` calls.
    pub fn rebuild(&self) {
        for bucket in self.buckets.iter() {
            bucket.store(0, Ordering::Relaxed);
        }

        let mut free = self.free.lock().unwrap();
        free.clear();
        let high = self
            .next
            .load(Ordering::Relaxed)
            .min(self.data.len() as u64);
        for index in FIRST_NODE_INDEX..high {
            if !self.is_marked(index) {
                free.push(index);
                continue;
            }
            let record = &self.data[index as usize];
            let start = Self::hash(
                record.a.load(Ordering::Relaxed),
                record.b.load(Ordering::Relaxed),
            );
            // The bucket array is larger than the record array, so an empty
            // bucket always exists within one wrap.
            for i in 0..=self.mask {
                let bucket = &self.buckets[(start + i) & self.mask];
                if bucket.load(Ordering::Relaxed) == 0 {
                    bucket.store(index, Ordering::Relaxed);
                    break;
                }
            }
        }
        self.next.store(high, Ordering::Relaxed);

        for word in self.marks.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }
}
