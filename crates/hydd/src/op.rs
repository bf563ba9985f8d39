//! Native operators: cache discriminators and statistics

use hydd_core::Edge;

/// Native operators of the engine
///
/// The discriminant doubles as the cache discriminator (mixed into the
/// first key word) and as the statistics index. Discriminants start at 1 so
/// that a cache key word is never zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Op {
    And = 1,
    Not,
    Ite,
    Exists,
    ExistsDom,
    RelNext,
    ExtendDomain,
    UnionCube,
    FromMtbdd,
    ToMtbdd,
    SatCount,
    Collect,
}

impl Op {
    pub(crate) const COUNT: usize = Op::Collect as usize + 1;
}

// Every discriminator must fit the four bits above an edge's index/tag
// fields.
const _: () = assert!(Op::COUNT <= 16);

/// First cache key word: the operation discriminator in the four bits above
/// the edge's index/tag fields
#[inline]
pub(crate) fn cache_key(op: Op, e: Edge) -> u64 {
    (op as u64) << 60 | e.raw()
}

#[cfg(feature = "statistics")]
pub(crate) struct StatCounters {
    pub calls: std::sync::atomic::AtomicU64,
    pub cache_queries: std::sync::atomic::AtomicU64,
    pub cache_hits: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "statistics")]
impl StatCounters {
    const INIT: StatCounters = StatCounters {
        calls: std::sync::atomic::AtomicU64::new(0),
        cache_queries: std::sync::atomic::AtomicU64::new(0),
        cache_hits: std::sync::atomic::AtomicU64::new(0),
    };
}

#[cfg(feature = "statistics")]
pub(crate) static STAT_COUNTERS: [StatCounters; Op::COUNT] = [StatCounters::INIT; Op::COUNT];

/// Print per-operation call and cache-hit counters to stderr
#[cfg(feature = "statistics")]
pub fn print_stats() {
    use std::sync::atomic::Ordering::Relaxed;

    const NAMES: [&str; Op::COUNT] = [
        "-",
        "and",
        "not",
        "ite",
        "exists",
        "exists_dom",
        "relnext",
        "extend_domain",
        "union_cube",
        "from_mtbdd",
        "to_mtbdd",
        "sat_count",
        "collect",
    ];
    eprintln!("[hydd statistics]");
    for (name, c) in NAMES.iter().zip(&STAT_COUNTERS).skip(1) {
        eprintln!(
            "{name}: {} calls, {} / {} cache hits",
            c.calls.load(Relaxed),
            c.cache_hits.load(Relaxed),
            c.cache_queries.load(Relaxed),
        );
    }
}

/// Count an operation event; compiles to nothing without the `statistics`
/// feature.
macro_rules! stat {
    (call $op:expr) => {
        #[cfg(feature = "statistics")]
        $crate::op::STAT_COUNTERS[$op as usize]
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        #[cfg(not(feature = "statistics"))]
        let _ = $op;
    };
    (cache_query $op:expr) => {
        #[cfg(feature = "statistics")]
        $crate::op::STAT_COUNTERS[$op as usize]
            .cache_queries
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        #[cfg(not(feature = "statistics"))]
        let _ = $op;
    };
    (cache_hit $op:expr) => {
        #[cfg(feature = "statistics")]
        $crate::op::STAT_COUNTERS[$op as usize]
            .cache_hits
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        #[cfg(not(feature = "statistics"))]
        let _ = $op;
    };
}

pub(crate) use stat;
