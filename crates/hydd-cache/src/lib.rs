//! Fixed-size lossy memoization cache
//!
//! Operation results are memoized in a direct-mapped table of fixed size.
//! The cache is purely advisory: a colliding insertion overwrites the
//! previous entry, a racing insertion may be dropped, and a lookup may miss
//! — but a lookup never returns a result for a different key. Every slot is
//! guarded by its own sequence counter, so readers detect torn values and
//! writers never block.
//!
//! Three entry shapes share the same slots: a three-word key with a
//! one-word result, a four-word key with a one-word result (used for
//! operations whose operand triple plus domain exceeds three words), and a
//! three-word key with a two-word result. The first key word carries the
//! operation identifier in its upper bits, so entries of different shapes
//! never alias.

use std::hash::Hasher;
use std::sync::atomic::{fence, AtomicU64, Ordering};

use rustc_hash::FxHasher;

const WORDS: usize = 5;

struct Slot {
    seq: AtomicU64,
    w: [AtomicU64; WORDS],
}

impl Slot {
    const EMPTY: Slot = Slot {
        seq: AtomicU64::new(0),
        w: [
            AtomicU64::new(0),
            AtomicU64::new(0),
            AtomicU64::new(0),
            AtomicU64::new(0),
            AtomicU64::new(0),
        ],
    };

    /// Consistent snapshot of the payload words, or `None` if a writer is
    /// active or finished in between
    fn read(&self) -> Option<[u64; WORDS]> {
        let before = self.seq.load(Ordering::Acquire);
        if before & 1 != 0 {
            return None;
        }
        let mut w = [0; WORDS];
        for (dst, src) in w.iter_mut().zip(&self.w) {
            *dst = src.load(Ordering::Relaxed);
        }
        fence(Ordering::Acquire);
        if self.seq.load(Ordering::Relaxed) == before {
            Some(w)
        } else {
            None
        }
    }

    /// Overwrite the payload; gives up (lossy) when another writer holds
    /// the slot
    fn write(&self, w: [u64; WORDS]) -> bool {
        let before = self.seq.load(Ordering::Relaxed);
        if before & 1 != 0 {
            return false;
        }
        if self
            .seq
            .compare_exchange(before, before + 1, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        for (dst, src) in self.w.iter().zip(w) {
            dst.store(src, Ordering::Relaxed);
        }
        self.seq.store(before + 2, Ordering::Release);
        true
    }
}

/// Direct-mapped memoization cache with a fixed power-of-two slot count
pub struct ApplyCache {
    slots: Box<[Slot]>,
    mask: usize,
}

impl ApplyCache {
    /// Cache with at least `capacity` slots (rounded up to a power of two)
    pub fn new(capacity: usize) -> Self {
        let len = capacity.max(1).next_power_of_two();
        let slots = std::iter::repeat_with(|| Slot::EMPTY)
            .take(len)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        ApplyCache {
            slots,
            mask: len - 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, key: &[u64]) -> &Slot {
        let mut h = FxHasher::default();
        for &k in key {
            h.write_u64(k);
        }
        &self.slots[h.finish() as usize & self.mask]
    }

    /// Look up a three-word key
    pub fn get3(&self, k0: u64, k1: u64, k2: u64) -> Option<u64> {
        let w = self.slot(&[k0, k1, k2]).read()?;
        (w[0] == k0 && w[1] == k1 && w[2] == k2).then(|| w[3])
    }

    /// Record a result under a three-word key
    pub fn put3(&self, k0: u64, k1: u64, k2: u64, result: u64) -> bool {
        self.slot(&[k0, k1, k2]).write([k0, k1, k2, result, 0])
    }

    /// Look up a four-word key
    pub fn get4(&self, k0: u64, k1: u64, k2: u64, k3: u64) -> Option<u64> {
        let w = self.slot(&[k0, k1, k2, k3]).read()?;
        (w[0] == k0 && w[1] == k1 && w[2] == k2 && w[3] == k3).then(|| w[4])
    }

    /// Record a result under a four-word key
    pub fn put4(&self, k0: u64, k1: u64, k2: u64, k3: u64, result: u64) -> bool {
        self.slot(&[k0, k1, k2, k3]).write([k0, k1, k2, k3, result])
    }

    /// Look up a three-word key with a two-word result
    pub fn get6(&self, k0: u64, k1: u64, k2: u64) -> Option<(u64, u64)> {
        let w = self.slot(&[k0, k1, k2]).read()?;
        (w[0] == k0 && w[1] == k1 && w[2] == k2).then(|| (w[3], w[4]))
    }

    /// Record a two-word result under a three-word key
    pub fn put6(&self, k0: u64, k1: u64, k2: u64, r0: u64, r1: u64) -> bool {
        self.slot(&[k0, k1, k2]).write([k0, k1, k2, r0, r1])
    }

    /// Drop every entry
    ///
    /// Requires external quiescence (no concurrent readers or writers);
    /// called after a garbage collection, when cached results may refer to
    /// reclaimed nodes.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            for w in &slot.w {
                w.store(0, Ordering::Relaxed);
            }
            let seq = slot.seq.load(Ordering::Relaxed);
            slot.seq.store((seq + 2) & !1, Ordering::Release);
        }
    }
}
