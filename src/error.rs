use thiserror::Error;

pub type Result<T> = std::result::Result<T, BloomError>;

#[derive(Error, Debug)]
pub enum BloomError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Raised by probe strategies that cannot linearize a key into an
    /// integer sequence. The byte-slice API always linearizes, so this is
    /// only reachable through strategies over richer key types.
    #[error("Key not supported by probe strategy: {0}")]
    UnsupportedKey(String),

    #[error("Incompatible filters: {0}")]
    IncompatibleFilters(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// A probe position outside the bit vector. Probe generators reduce
    /// positions modulo the vector length, so hitting this through the
    /// filter engine is a programming error.
    #[error("Bit index out of range: {index} >= {num_bits}")]
    IndexOutOfRange { index: u64, num_bits: u64 },
}
