use crate::error::Result;
use crate::params::{FilterParams, WORD_BITS};
use fnv::FnvHasher;
use murmur3::murmur3_32;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::hash::Hasher;
use std::io::Cursor;

/// One bit position for a key, as the word holding it plus the mask of the
/// bit inside that word. A key maps to exactly `num_probes` of these per
/// operation; probe sets are transient and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub word: u64,
    pub mask: u32,
}

impl Probe {
    /// Absolute position in the bit vector.
    pub fn bit_index(&self) -> u64 {
        self.word * WORD_BITS + self.mask.trailing_zeros() as u64
    }
}

/// How a key is turned into its probe positions.
///
/// The strategy tag participates in template compatibility: two filters can
/// only be unioned/intersected when they generate probes the same way.
/// Comparing the tag replaces the source design's comparison of hash
/// function identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// Seed a small PRNG purely from the key bytes and draw
    /// `(word, bit-in-word)` pairs from the seeded stream.
    SeededRng,
    /// Classic double hashing: two rolling hashes `h1`, `h2` combined
    /// linearly, probe `j` landing on bit `h1 + j * h2`. Two hash
    /// computations approximate `k` independent hash functions.
    DoubleHash,
}

pub(crate) fn hash_murmur32(key: &[u8]) -> u32 {
    let mut cursor = Cursor::new(key);
    murmur3_32(&mut cursor, 0).expect("Failed to compute Murmur3 hash")
}

pub(crate) fn hash_fnv32(key: &[u8]) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.finish() as u32
}

// Mersenne prime triples (a, b, c) for the rolling accumulation
// `acc = ((acc + byte + a) * b) mod c`. The triples must differ so the two
// hashes are independent; c bounds the accumulator.
const HASH1_PRIMES: (u64, u64, u64) = (
    (1 << 17) - 1, // 2^17 - 1
    (1 << 19) - 1, // 2^19 - 1
    (1 << 31) - 1, // 2^31 - 1
);
const HASH2_PRIMES: (u64, u64, u64) = (
    (1 << 13) - 1, // 2^13 - 1
    (1 << 17) - 1, // 2^17 - 1
    (1 << 61) - 1, // 2^61 - 1
);

fn rolling_hash(key: &[u8], primes: (u64, u64, u64)) -> u64 {
    let (prime_a, prime_b, prime_c) = primes;
    let mut acc: u128 = 0;
    for &byte in key {
        acc = ((acc + byte as u128 + prime_a as u128) * prime_b as u128)
            % prime_c as u128;
    }
    acc as u64
}

fn seeded_rng_probes(key: &[u8], num_probes: u32, word_count: u64) -> Vec<Probe> {
    // The seed is a pure function of the key bytes, so repeated calls for
    // the same key replay the identical probe sequence.
    let seed = ((hash_murmur32(key) as u64) << 32) | hash_fnv32(key) as u64;
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..num_probes)
        .map(|_| {
            let word = rng.random_range(0..word_count);
            let bit = rng.random_range(0..WORD_BITS) as u32;
            Probe {
                word,
                mask: 1 << bit,
            }
        })
        .collect()
}

fn double_hash_probes(key: &[u8], num_probes: u32, word_count: u64) -> Vec<Probe> {
    let h1 = rolling_hash(key, HASH1_PRIMES) as u128;
    let h2 = rolling_hash(key, HASH2_PRIMES) as u128;
    (1..=num_probes as u128)
        .map(|probe_no| {
            let bit_index = h1 + probe_no * h2;
            let word = ((bit_index / WORD_BITS as u128)
                % word_count as u128) as u64;
            let bit = (bit_index % WORD_BITS as u128) as u32;
            Probe {
                word,
                mask: 1 << bit,
            }
        })
        .collect()
}

impl ProbeStrategy {
    /// Generate the probe set for `key` under `params`. Deterministic:
    /// the same key and parameters always yield the identical sequence,
    /// which is what makes add-then-query line up.
    pub fn probes_for(
        &self,
        key: &[u8],
        params: &FilterParams,
    ) -> Result<Vec<Probe>> {
        let word_count = params.word_count();
        let probes = match self {
            ProbeStrategy::SeededRng => {
                seeded_rng_probes(key, params.num_probes, word_count)
            }
            ProbeStrategy::DoubleHash => {
                double_hash_probes(key, params.num_probes, word_count)
            }
        };
        Ok(probes)
    }
}
