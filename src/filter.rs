use crate::error::{BloomError, Result};
use crate::file_storage::SeekFileBackend;
use crate::mmap_storage::MmapBackend;
use crate::params::FilterParams;
use crate::probe::ProbeStrategy;
#[cfg(feature = "redis")]
use crate::redis_storage::RedisBackend;
use crate::storage::{BitStorage, MemoryBackend};
use derive_builder::Builder;
use std::path::Path;
use tracing::debug;

/// Construction-time knobs shared by every backend.
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct FilterConfig {
    /// Number of elements the filter is sized for. Adding more than this
    /// does not fail, it just erodes the error-rate guarantee.
    #[builder(default = "1_000_000")]
    pub capacity: u64,

    /// Target false-positive probability at full capacity, in (0, 1).
    #[builder(default = "0.01")]
    pub error_rate: f64,

    /// Probe generation strategy; part of the filter's template identity.
    #[builder(default = "ProbeStrategy::DoubleHash")]
    pub strategy: ProbeStrategy,
}

/// Probabilistic set-membership testing for large sets.
///
/// Generic over its [`BitStorage`] backend: the same engine runs over an
/// in-process buffer, a memory-mapped file, a seek-addressed file or a
/// Redis namespace. Membership answers have no false negatives; false
/// positives occur with probability bounded by the configured error rate
/// while at or below capacity.
///
/// The engine does no internal locking. Sharing one filter across threads
/// needs caller-side mutual exclusion.
pub struct BloomFilter<S: BitStorage> {
    params: FilterParams,
    storage: S,
}

impl BloomFilter<MemoryBackend> {
    pub fn new_in_memory(config: FilterConfig) -> Result<Self> {
        let params = FilterParams::derive(
            config.capacity,
            config.error_rate,
            config.strategy,
        )?;
        let storage = MemoryBackend::new(params.num_bits)?;
        debug!(?params, "created in-memory bloom filter");
        Ok(Self { params, storage })
    }
}

impl BloomFilter<MmapBackend> {
    /// Create-or-attach over a mapped file; an existing file of the right
    /// size keeps its prior contents, so previously added keys survive.
    pub fn new_mmap(config: FilterConfig, path: impl AsRef<Path>) -> Result<Self> {
        let params = FilterParams::derive(
            config.capacity,
            config.error_rate,
            config.strategy,
        )?;
        let storage = MmapBackend::open(path, params.num_bits)?;
        debug!(?params, "opened mmap bloom filter");
        Ok(Self { params, storage })
    }
}

impl BloomFilter<SeekFileBackend> {
    pub fn new_seek_file(
        config: FilterConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let params = FilterParams::derive(
            config.capacity,
            config.error_rate,
            config.strategy,
        )?;
        let storage = SeekFileBackend::open(path, params.num_bits)?;
        debug!(?params, "opened seek-file bloom filter");
        Ok(Self { params, storage })
    }
}

#[cfg(feature = "redis")]
impl BloomFilter<RedisBackend> {
    /// Attach to the shared bit vector under `prefix`. Several clients may
    /// attach to the same prefix; the filter owns the connection handle,
    /// not the remote bits.
    pub fn new_redis(
        config: FilterConfig,
        redis_url: &str,
        prefix: &str,
    ) -> Result<Self> {
        let params = FilterParams::derive(
            config.capacity,
            config.error_rate,
            config.strategy,
        )?;
        let storage =
            RedisBackend::new(redis_url, prefix, params.num_bits)?;
        debug!(?params, prefix, "opened redis bloom filter");
        Ok(Self { params, storage })
    }
}

impl<S: BitStorage> BloomFilter<S> {
    /// Wire the engine to an already-constructed storage. The storage must
    /// hold exactly the bit count derived from the config.
    pub fn with_storage(config: FilterConfig, storage: S) -> Result<Self> {
        let params = FilterParams::derive(
            config.capacity,
            config.error_rate,
            config.strategy,
        )?;
        if storage.num_bits() != params.num_bits {
            return Err(BloomError::InvalidParameter(format!(
                "storage holds {} bits but parameters require {}",
                storage.num_bits(),
                params.num_bits
            )));
        }
        Ok(Self { params, storage })
    }

    /// Add a key to the filter. Either all probe bits get set or the call
    /// fails partway with a storage error, in which case the key's
    /// membership is undefined until the add is retried.
    pub fn add(&mut self, key: &[u8]) -> Result<()> {
        for probe in self.params.strategy.probes_for(key, &self.params)? {
            self.storage.set_bit(probe.bit_index())?;
        }
        Ok(())
    }

    /// Membership test: true iff every probe bit is set. A key that was
    /// added always answers true; a key that was not answers true with
    /// probability about `error_rate` when at or below capacity.
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        for probe in self.params.strategy.probes_for(key, &self.params)? {
            if !self.storage.get_bit(probe.bit_index())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Remove a key by clearing its probe bits unconditionally.
    ///
    /// This is lossy: a cleared bit may be shared with another
    /// still-present key, which then stops answering true. There is no
    /// per-bit counting to arbitrate sharing, so only use deletion where
    /// the application tolerates that hazard.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        for probe in self.params.strategy.probes_for(key, &self.params)? {
            self.storage.clear_bit(probe.bit_index())?;
        }
        Ok(())
    }

    /// Set union into a new memory-backed filter, word at a time.
    ///
    /// The result over-approximates the union of the underlying sets: it
    /// keeps both inputs' false positives but introduces no new false
    /// negatives relative to either input.
    pub fn union<O: BitStorage>(
        &self,
        other: &BloomFilter<O>,
    ) -> Result<BloomFilter<MemoryBackend>> {
        self.check_template(other, "union")?;
        self.combine(other, |a, b| a | b)
    }

    /// Set intersection into a new memory-backed filter, word at a time.
    ///
    /// Bloom intersection under-approximates: the result may answer true
    /// for keys present in neither source (bits can coincide across
    /// unrelated keys). A known property of the structure, not a defect.
    pub fn intersection<O: BitStorage>(
        &self,
        other: &BloomFilter<O>,
    ) -> Result<BloomFilter<MemoryBackend>> {
        self.check_template(other, "intersection")?;
        self.combine(other, |a, b| a & b)
    }

    /// Template compatibility: equal bit count, probe count and strategy.
    /// Backend type does not participate, so cross-backend binary
    /// operations (say, memory unioned with a Redis-backed filter) are
    /// fine whenever the shapes line up.
    pub fn is_compatible_with<O: BitStorage>(
        &self,
        other: &BloomFilter<O>,
    ) -> bool {
        self.params.matches_template(&other.params)
    }

    fn check_template<O: BitStorage>(
        &self,
        other: &BloomFilter<O>,
        operation: &str,
    ) -> Result<()> {
        if !self.is_compatible_with(other) {
            return Err(BloomError::IncompatibleFilters(format!(
                "{operation} requires matching templates: \
                 {} bits / {} probes / {:?} vs {} bits / {} probes / {:?}",
                self.params.num_bits,
                self.params.num_probes,
                self.params.strategy,
                other.params.num_bits,
                other.params.num_probes,
                other.params.strategy,
            )));
        }
        Ok(())
    }

    fn combine<O: BitStorage>(
        &self,
        other: &BloomFilter<O>,
        merge: impl Fn(u32, u32) -> u32,
    ) -> Result<BloomFilter<MemoryBackend>> {
        let mut storage = MemoryBackend::new(self.params.num_bits)?;
        for word in 0..self.params.word_count() {
            let merged = merge(
                self.storage.read_word(word)?,
                other.storage.read_word(word)?,
            );
            storage.write_word(word, merged)?;
        }
        Ok(BloomFilter {
            params: self.params,
            storage,
        })
    }

    /// Write any buffered storage state through to the backing medium.
    pub fn flush(&mut self) -> Result<()> {
        self.storage.flush()
    }

    pub fn bit_count(&self) -> u64 {
        self.params.num_bits
    }

    pub fn probe_count(&self) -> u32 {
        self.params.num_probes
    }

    pub fn capacity(&self) -> u64 {
        self.params.capacity
    }

    pub fn error_rate(&self) -> f64 {
        self.params.error_rate
    }

    pub fn strategy(&self) -> ProbeStrategy {
        self.params.strategy
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }
}

impl<S: BitStorage> std::fmt::Debug for BloomFilter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BloomFilter {{ capacity: {}, error_rate: {}, num_bits: {}, num_probes: {}, strategy: {:?} }}",
            self.params.capacity,
            self.params.error_rate,
            self.params.num_bits,
            self.params.num_probes,
            self.params.strategy,
        )
    }
}
