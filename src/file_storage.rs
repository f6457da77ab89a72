use crate::error::{BloomError, Result};
use crate::params::WORD_BITS;
use crate::storage::{BitStorage, check_bit_index, check_word_index};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct CachedWord {
    word: u64,
    value: u32,
    dirty: bool,
}

struct Inner {
    file: File,
    // Read/modify/write cache of the most recently touched word. Probes for
    // one key often land in the same word; this batches those accesses into
    // a single seek. Must be written back before the handle closes.
    cache: Option<CachedWord>,
}

/// Bit vector on a plain file, addressed with explicit seek-then-read/write
/// of the containing 32-bit word.
///
/// Slower per operation than [`crate::MmapBackend`] but needs no address-space
/// mapping, which matters when the bit vector is far larger than what can be
/// mapped. Shares the mmap backend's on-disk layout, so the same file can be
/// opened by either.
pub struct SeekFileBackend {
    inner: Mutex<Inner>,
    num_bits: u64,
    path: PathBuf,
}

impl SeekFileBackend {
    /// Create-or-attach, with the same size rules as the mmap backend: a
    /// zero-length file is extended and zero-filled, an expected-size file
    /// is attached preserving contents, anything else is refused.
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
            file.set_len(byte_size).map_err(|e| {
                BloomError::Storage(format!(
                    "failed to size {}: {e}",
                    path.display()
                ))
            })?;
            debug!(path = %path.display(), bytes = byte_size, "created seek-file bit vector");
        } else if file_len == byte_size {
            debug!(path = %path.display(), bytes = byte_size, "attached existing seek-file bit vector");
        } else {
            return Err(BloomError::Storage(format!(
                "{} holds {file_len} bytes, expected {byte_size}",
                path.display()
            )));
        }

        Ok(Self {
            inner: Mutex::new(Inner { file, cache: None }),
            num_bits,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| BloomError::Storage(format!("lock error: {e}")))
    }
}

impl Inner {
    fn read_word_from_file(&mut self, word: u64) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.file
            .seek(SeekFrom::Start(word * 4))
            .and_then(|_| self.file.read_exact(&mut bytes))
            .map_err(|e| {
                BloomError::Storage(format!("read of word {word} failed: {e}"))
            })?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_word_to_file(&mut self, word: u64, value: u32) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(word * 4))
            .and_then(|_| self.file.write_all(&value.to_le_bytes()))
            .map_err(|e| {
                BloomError::Storage(format!("write of word {word} failed: {e}"))
            })
    }

    fn flush_cache(&mut self) -> Result<()> {
        if let Some(cached) = self.cache {
            if cached.dirty {
                self.write_word_to_file(cached.word, cached.value)?;
                self.cache = Some(CachedWord {
                    dirty: false,
                    ..cached
                });
            }
        }
        Ok(())
    }

    /// Load `word` into the cache, writing back whatever was there first.
    fn load_word(&mut self, word: u64) -> Result<u32> {
        if let Some(cached) = self.cache {
            if cached.word == word {
                return Ok(cached.value);
            }
        }
        self.flush_cache()?;
        let value = self.read_word_from_file(word)?;
        self.cache = Some(CachedWord {
            word,
            value,
            dirty: false,
        });
        Ok(value)
    }

    fn store_word(&mut self, word: u64, value: u32) -> Result<()> {
        if let Some(cached) = self.cache {
            if cached.word != word {
                self.flush_cache()?;
            }
        }
        self.cache = Some(CachedWord {
            word,
            value,
            dirty: true,
        });
        Ok(())
    }
}

impl BitStorage for SeekFileBackend {
    fn num_bits(&self) -> u64 {
        self.num_bits
    }

    fn get_bit(&self, index: u64) -> Result<bool> {
        check_bit_index(index, self.num_bits)?;
        let mut inner = self.lock()?;
        let word = inner.load_word(index / WORD_BITS)?;
        Ok(word & (1 << (index % WORD_BITS)) != 0)
    }

    fn set_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        let word_index = index / WORD_BITS;
        let mut inner = self.lock()?;
        let word = inner.load_word(word_index)?;
        inner.store_word(word_index, word | (1 << (index % WORD_BITS)))
    }

    fn clear_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        let word_index = index / WORD_BITS;
        let mut inner = self.lock()?;
        let word = inner.load_word(word_index)?;
        inner.store_word(word_index, word & !(1 << (index % WORD_BITS)))
    }

    fn read_word(&self, word: u64) -> Result<u32> {
        check_word_index(word, self.word_count())?;
        self.lock()?.load_word(word)
    }

    fn write_word(&mut self, word: u64, value: u32) -> Result<()> {
        check_word_index(word, self.word_count())?;
        self.lock()?.store_word(word, value)
    }

    fn flush(&mut self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.flush_cache()?;
        inner.file.sync_data().map_err(|e| {
            BloomError::Storage(format!(
                "failed to sync {}: {e}",
                self.path.display()
            ))
        })
    }
}

impl Drop for SeekFileBackend {
    fn drop(&mut self) {
        // The cached word must reach the file even if the caller never
        // flushed explicitly.
        if let Ok(mut inner) = self.inner.lock() {
            let _ = inner.flush_cache();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        let mut storage = SeekFileBackend::open(&path, 256).unwrap();

        storage.set_bit(3).unwrap();
        storage.set_bit(250).unwrap();
        assert!(storage.get_bit(3).unwrap());
        assert!(storage.get_bit(250).unwrap());
        assert!(!storage.get_bit(4).unwrap());

        storage.clear_bit(3).unwrap();
        assert!(!storage.get_bit(3).unwrap());
    }

    #[test]
    fn test_cache_flushed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        {
            let mut storage = SeekFileBackend::open(&path, 64).unwrap();
            storage.set_bit(33).unwrap();
            // dropped with a dirty cached word, no explicit flush
        }
        let storage = SeekFileBackend::open(&path, 64).unwrap();
        assert!(storage.get_bit(33).unwrap());
    }

    #[test]
    fn test_interchangeable_with_mmap_layout() {
        use crate::mmap_storage::MmapBackend;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        {
            let mut storage = SeekFileBackend::open(&path, 128).unwrap();
            for index in [0, 13, 47, 99, 127] {
                storage.set_bit(index).unwrap();
            }
            storage.flush().unwrap();
        }
        let mapped = MmapBackend::open(&path, 128).unwrap();
        for index in 0..128 {
            let expected = matches!(index, 0 | 13 | 47 | 99 | 127);
            assert_eq!(mapped.get_bit(index).unwrap(), expected, "bit {index}");
        }
    }

    #[test]
    fn test_size_mismatch_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.bloom");
        SeekFileBackend::open(&path, 128).unwrap();
        assert!(SeekFileBackend::open(&path, 512).is_err());
    }
}
