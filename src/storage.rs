use crate::error::{BloomError, Result};
use crate::params::WORD_BITS;

/// Fixed-length bit vector a filter sits on.
///
/// Single-bit access drives `add`/`contains`/`delete`; the word-level calls
/// exist only so union/intersection can move whole words instead of single
/// bits. All bits are zero on creation. Implementations are not internally
/// synchronized; concurrent use of one storage instance needs external
/// mutual exclusion.
pub trait BitStorage {
    /// Total number of addressable bits, always a whole number of words.
    fn num_bits(&self) -> u64;

    fn get_bit(&self, index: u64) -> Result<bool>;
    fn set_bit(&mut self, index: u64) -> Result<()>;
    /// Clears a bit. Idempotent, like `set_bit`.
    fn clear_bit(&mut self, index: u64) -> Result<()>;

    fn read_word(&self, word: u64) -> Result<u32>;
    fn write_word(&mut self, word: u64, value: u32) -> Result<()>;

    fn word_count(&self) -> u64 {
        self.num_bits() / WORD_BITS
    }

    /// Push any buffered state down to the backing medium. A no-op for
    /// backends without write caching.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn check_bit_index(index: u64, num_bits: u64) -> Result<()> {
    if index >= num_bits {
        return Err(BloomError::IndexOutOfRange { index, num_bits });
    }
    Ok(())
}

pub(crate) fn check_word_index(word: u64, word_count: u64) -> Result<()> {
    if word >= word_count {
        return Err(BloomError::IndexOutOfRange {
            index: word * WORD_BITS,
            num_bits: word_count * WORD_BITS,
        });
    }
    Ok(())
}

/// Process-local bit vector packed into 32-bit words. No I/O on any path;
/// released together with the filter.
pub struct MemoryBackend {
    words: Vec<u32>,
    num_bits: u64,
}

impl MemoryBackend {
    pub fn new(num_bits: u64) -> Result<Self> {
        if num_bits == 0 || num_bits % WORD_BITS != 0 {
            return Err(BloomError::InvalidParameter(format!(
                "bit count must be a positive multiple of {WORD_BITS}, got {num_bits}"
            )));
        }
        Ok(Self {
            words: vec![0u32; (num_bits / WORD_BITS) as usize],
            num_bits,
        })
    }
}

impl BitStorage for MemoryBackend {
    fn num_bits(&self) -> u64 {
        self.num_bits
    }

    fn get_bit(&self, index: u64) -> Result<bool> {
        check_bit_index(index, self.num_bits)?;
        let word = self.words[(index / WORD_BITS) as usize];
        Ok(word & (1 << (index % WORD_BITS)) != 0)
    }

    fn set_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
        Ok(())
    }

    fn clear_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        self.words[(index / WORD_BITS) as usize] &= !(1 << (index % WORD_BITS));
        Ok(())
    }

    fn read_word(&self, word: u64) -> Result<u32> {
        check_word_index(word, self.word_count())?;
        Ok(self.words[word as usize])
    }

    fn write_word(&mut self, word: u64, value: u32) -> Result<()> {
        check_word_index(word, self.word_count())?;
        self.words[word as usize] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_start_cleared() {
        let storage = MemoryBackend::new(256).unwrap();
        for i in 0..256 {
            assert!(!storage.get_bit(i).unwrap());
        }
    }

    #[test]
    fn test_set_get_clear_roundtrip() {
        let mut storage = MemoryBackend::new(128).unwrap();
        storage.set_bit(0).unwrap();
        storage.set_bit(31).unwrap();
        storage.set_bit(32).unwrap();
        storage.set_bit(127).unwrap();

        assert!(storage.get_bit(0).unwrap());
        assert!(storage.get_bit(31).unwrap());
        assert!(storage.get_bit(32).unwrap());
        assert!(storage.get_bit(127).unwrap());
        assert!(!storage.get_bit(64).unwrap());

        storage.clear_bit(31).unwrap();
        assert!(!storage.get_bit(31).unwrap());
        // clearing twice is fine
        storage.clear_bit(31).unwrap();
        assert!(storage.get_bit(32).unwrap());
    }

    #[test]
    fn test_word_access_matches_bit_access() {
        let mut storage = MemoryBackend::new(64).unwrap();
        storage.set_bit(1).unwrap();
        storage.set_bit(5).unwrap();
        assert_eq!(storage.read_word(0).unwrap(), 0b100010);
        assert_eq!(storage.read_word(1).unwrap(), 0);

        storage.write_word(1, 0x8000_0001).unwrap();
        assert!(storage.get_bit(32).unwrap());
        assert!(storage.get_bit(63).unwrap());
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut storage = MemoryBackend::new(64).unwrap();
        assert!(matches!(
            storage.get_bit(64).unwrap_err(),
            BloomError::IndexOutOfRange { .. }
        ));
        assert!(matches!(
            storage.set_bit(1_000).unwrap_err(),
            BloomError::IndexOutOfRange { .. }
        ));
        assert!(matches!(
            storage.read_word(2).unwrap_err(),
            BloomError::IndexOutOfRange { .. }
        ));
    }

    #[test]
    fn test_unaligned_size_rejected() {
        assert!(MemoryBackend::new(0).is_err());
        assert!(MemoryBackend::new(33).is_err());
    }
}
