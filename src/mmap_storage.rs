use crate::error::{BloomError, Result};
use crate::params::WORD_BITS;
use crate::storage::{BitStorage, check_bit_index, check_word_index};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bit vector backed by a fixed-size file mapped into the address space.
///
/// Writes are visible to any other process mapping the same path; the
/// engine adds no cross-process coordination on top, which is acceptable
/// because filter bits are only ever set (last-writer-wins at the bit
/// level). Durability covers flushed pages, not pages lost to a crash
/// before `flush`.
///
/// Opening is create-or-attach: a file already holding a bit vector of the
/// expected size is attached as-is, preserving its contents; a missing file
/// is created zero-filled. Any other size on disk is refused rather than
/// silently resized.
#[derive(Debug)]
pub struct MmapBackend {
    mmap: MmapMut,
    num_bits: u64,
    path: PathBuf,
}

impl MmapBackend {
    pub fn open(path: impl AsRef<Path>, num_bits: u64) -> Result<Self> {
        if num_bits == 0 || num_bits % WORD_BITS != 0 {
            return Err(BloomError::InvalidParameter(format!(
                "bit count must be a positive multiple of {WORD_BITS}, got {num_bits}"
            )));
        }
        let path = path.as_ref().to_path_buf();
        let byte_size = num_bits / 8;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                BloomError::Storage(format!(
                    "failed to open {}: {e}",
                    path.display()
                ))
            })?;

        let file_len = file
            .metadata()
            .map_err(|e| BloomError::Storage(format!("metadata failed: {e}")))?
            .len();

        if file_len == 0 {
            // Fresh file: extending zero-fills, which is exactly the
            // all-bits-clear initial state.
            file.set_len(byte_size).map_err(|e| {
                BloomError::Storage(format!(
                    "failed to size {}: {e}",
                    path.display()
                ))
            })?;
            debug!(path = %path.display(), bytes = byte_size, "created mmap bit vector");
        } else if file_len == byte_size {
            debug!(path = %path.display(), bytes = byte_size, "attached existing mmap bit vector");
        } else {
            return Err(BloomError::Storage(format!(
                "{} holds {file_len} bytes, expected {byte_size}",
                path.display()
            )));
        }

        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| {
            BloomError::Storage(format!(
                "failed to map {}: {e}",
                path.display()
            ))
        })?;

        Ok(Self {
            mmap,
            num_bits,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BitStorage for MmapBackend {
    fn num_bits(&self) -> u64 {
        self.num_bits
    }

    fn get_bit(&self, index: u64) -> Result<bool> {
        check_bit_index(index, self.num_bits)?;
        let byte = self.mmap[(index / 8) as usize];
        Ok(byte & (1 << (index % 8)) != 0)
    }

    fn set_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        self.mmap[(index / 8) as usize] |= 1 << (index % 8);
        Ok(())
    }

    fn clear_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        self.mmap[(index / 8) as usize] &= !(1 << (index % 8));
        Ok(())
    }

    fn read_word(&self, word: u64) -> Result<u32> {
        check_word_index(word, self.word_count())?;
        let offset = (word * 4) as usize;
        let bytes: [u8; 4] = self.mmap[offset..offset + 4]
            .try_into()
            .expect("word slice is 4 bytes");
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_word(&mut self, word: u64, value: u32) -> Result<()> {
        check_word_index(word, self.word_count())?;
        let offset = (word * 4) as usize;
        self.mmap[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.mmap.flush().map_err(|e| {
            BloomError::Storage(format!(
                "failed to flush {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_bit_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        let mut storage = MmapBackend::open(&path, 256).unwrap();

        assert!(!storage.get_bit(200).unwrap());
        storage.set_bit(200).unwrap();
        assert!(storage.get_bit(200).unwrap());
        storage.clear_bit(200).unwrap();
        assert!(!storage.get_bit(200).unwrap());
    }

    #[test]
    fn test_attach_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        {
            let mut storage = MmapBackend::open(&path, 128).unwrap();
            storage.set_bit(7).unwrap();
            storage.set_bit(120).unwrap();
            storage.flush().unwrap();
        }
        let storage = MmapBackend::open(&path, 128).unwrap();
        assert!(storage.get_bit(7).unwrap());
        assert!(storage.get_bit(120).unwrap());
        assert!(!storage.get_bit(8).unwrap());
    }

    #[test]
    fn test_size_mismatch_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        MmapBackend::open(&path, 128).unwrap();
        let err = MmapBackend::open(&path, 256).unwrap_err();
        assert!(matches!(err, BloomError::Storage(_)));
    }

    #[test]
    fn test_word_layout_is_little_endian() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        let mut storage = MmapBackend::open(&path, 64).unwrap();
        // bit 0 lives in the lowest byte of word 0
        storage.set_bit(0).unwrap();
        storage.set_bit(9).unwrap();
        assert_eq!(storage.read_word(0).unwrap(), (1 << 9) | 1);

        storage.write_word(1, 0x0102_0304).unwrap();
        storage.flush().unwrap();
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[4..8], &[0x04, 0x03, 0x02, 0x01]);
    }
}
