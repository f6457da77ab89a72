use crate::error::{BloomError, Result};
use crate::probe::ProbeStrategy;

/// Width of a storage word in bits. Bulk union/intersection moves the bit
/// vector one word at a time, and file layouts pack bits into little-endian
/// words of this width.
pub const WORD_BITS: u64 = 32;

/// Sizing derived once at construction, immutable for the filter's life.
///
/// In the literature: `m` is `num_bits`, `k` is `num_probes`, `n` is
/// `capacity` and `p` is `error_rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub capacity: u64,
    pub error_rate: f64,
    pub num_bits: u64,
    pub num_probes: u32,
    pub strategy: ProbeStrategy,
}

/// `m = ceil(-n * ln(p) / ln(2)^2)`, rounded up to a whole number of
/// storage words so word-wise bulk operations never straddle a partial word.
pub fn optimal_num_bits(capacity: u64, error_rate: f64) -> u64 {
    let ln2 = std::f64::consts::LN_2;
    let real_bits = (-(capacity as f64) * error_rate.ln()) / (ln2 * ln2);
    let bits = real_bits.ceil() as u64;
    bits.div_ceil(WORD_BITS) * WORD_BITS
}

/// `k = ceil(m / n * ln(2))`, floored at one probe. Rounding is always up:
/// underestimating either value weakens the error-rate guarantee.
pub fn optimal_num_probes(capacity: u64, num_bits: u64) -> u32 {
    let real_probes =
        (num_bits as f64 / capacity as f64) * std::f64::consts::LN_2;
    (real_probes.ceil() as u32).max(1)
}

impl FilterParams {
    pub fn derive(
        capacity: u64,
        error_rate: f64,
        strategy: ProbeStrategy,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(BloomError::InvalidParameter(
                "capacity must be greater than 0".into(),
            ));
        }
        if error_rate <= 0.0 || error_rate >= 1.0 {
            return Err(BloomError::InvalidParameter(format!(
                "error rate must be between 0 and 1, got {error_rate}"
            )));
        }

        let num_bits = optimal_num_bits(capacity, error_rate);
        let num_probes = optimal_num_probes(capacity, num_bits);

        Ok(Self {
            capacity,
            error_rate,
            num_bits,
            num_probes,
            strategy,
        })
    }

    pub fn word_count(&self) -> u64 {
        self.num_bits / WORD_BITS
    }

    /// Byte size of the flat file layout used by the file-backed storages.
    pub fn byte_size(&self) -> u64 {
        self.num_bits / 8
    }

    /// Structural signature compared before union/intersection. Backend
    /// type deliberately does not participate: cross-backend binary
    /// operations are legal as long as the shapes match.
    pub fn matches_template(&self, other: &FilterParams) -> bool {
        self.num_bits == other.num_bits
            && self.num_probes == other.num_probes
            && self.strategy == other.strategy
    }
}
