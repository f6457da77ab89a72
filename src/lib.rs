//! Classic Bloom filter with pluggable bit-storage backends.
//!
//! A Bloom filter answers "might this key be a member?" with no false
//! negatives and a tunable false-positive rate, in far less memory than an
//! exact set. Sizing is derived from a target capacity `n` and error rate
//! `p`: `m = ceil(-n * ln(p) / ln(2)^2)` bits and `k = ceil(m / n * ln(2))`
//! probes per key, verified against the usual false-positive formula.
//!
//! The engine is split from its storage:
//!     * [`MemoryBackend`] - process-local word array, no I/O.
//!     * [`MmapBackend`] - fixed-size file mapped into the address space,
//!       shareable between processes mapping the same path.
//!     * [`SeekFileBackend`] - seek-then-read/write per word, for bit
//!       vectors too large to map comfortably.
//!     * `RedisBackend` (feature `redis`) - one key per bit under a
//!       namespace prefix in a shared Redis instance.
//!
//! Two probe strategies map a key to its `k` bit positions: a PRNG seeded
//! from the key bytes, or double hashing (`h1 + j * h2`). The strategy tag
//! is part of a filter's template; union and intersection only combine
//! filters whose bit count, probe count and strategy all match.
//!
//! Known hazards, inherent to the structure rather than fixable here:
//!     * `delete` clears probe bits unconditionally. A bit shared with
//!       another key un-marks that key too; there is no per-bit counting.
//!     * Intersection may answer true for keys present in neither source
//!       filter.
//!     * Adding past `capacity` degrades the error-rate guarantee, it does
//!       not fail.

mod error;
mod file_storage;
mod filter;
mod mmap_storage;
mod params;
mod probe;
#[cfg(feature = "redis")]
mod redis_storage;
mod storage;

pub use error::{BloomError, Result};
pub use file_storage::SeekFileBackend;
pub use filter::{
    BloomFilter, FilterConfig, FilterConfigBuilder, FilterConfigBuilderError,
};
pub use mmap_storage::MmapBackend;
pub use params::{FilterParams, WORD_BITS, optimal_num_bits, optimal_num_probes};
pub use probe::{Probe, ProbeStrategy};
#[cfg(feature = "redis")]
pub use redis_storage::RedisBackend;
pub use storage::{BitStorage, MemoryBackend};
