use crate::error::{BloomError, Result};
use crate::params::WORD_BITS;
use crate::storage::{BitStorage, check_bit_index, check_word_index};
use redis::{Client, Commands, Connection};
use std::sync::Mutex;
use tracing::debug;

/// Bit vector living in a shared Redis instance, one logical key per bit
/// index under a caller-chosen namespace prefix. A set bit is a present
/// key with a flag value; a cleared bit is an absent key.
///
/// The underlying bits are shared external state: any number of clients may
/// attach to the same prefix and see each other's writes. The filter owns
/// only this connection handle, never the remote data's lifetime, and no
/// client-side caching happens here because presence must reflect the
/// latest write visible to any client. Every bit operation is a round trip;
/// word operations are pipelined per-bit round trips.
pub struct RedisBackend {
    conn: Mutex<Connection>,
    num_bits: u64,
    prefix: String,
}

impl RedisBackend {
    pub fn new(redis_url: &str, prefix: &str, num_bits: u64) -> Result<Self> {
        if num_bits == 0 || num_bits % WORD_BITS != 0 {
            return Err(BloomError::InvalidParameter(format!(
                "bit count must be a positive multiple of {WORD_BITS}, got {num_bits}"
            )));
        }

        let client = Client::open(redis_url).map_err(|e| {
            BloomError::Storage(format!("Redis connection error: {e}"))
        })?;
        let conn = client.get_connection().map_err(|e| {
            BloomError::Storage(format!("Redis connection error: {e}"))
        })?;

        debug!(prefix, num_bits, "attached Redis bit vector");

        Ok(Self {
            conn: Mutex::new(conn),
            num_bits,
            prefix: prefix.to_string(),
        })
    }

    fn bit_key(&self, index: u64) -> String {
        format!("{}:bit:{}", self.prefix, index)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BloomError::Storage(format!("Redis lock error: {e}")))
    }
}

impl BitStorage for RedisBackend {
    fn num_bits(&self) -> u64 {
        self.num_bits
    }

    fn get_bit(&self, index: u64) -> Result<bool> {
        check_bit_index(index, self.num_bits)?;
        let mut conn = self.lock()?;
        conn.exists(self.bit_key(index))
            .map_err(|e| BloomError::Storage(format!("Redis error: {e}")))
    }

    fn set_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        let mut conn = self.lock()?;
        let _: () = conn
            .set(self.bit_key(index), 1u8)
            .map_err(|e| BloomError::Storage(format!("Redis error: {e}")))?;
        Ok(())
    }

    fn clear_bit(&mut self, index: u64) -> Result<()> {
        check_bit_index(index, self.num_bits)?;
        let mut conn = self.lock()?;
        let _: () = conn
            .del(self.bit_key(index))
            .map_err(|e| BloomError::Storage(format!("Redis error: {e}")))?;
        Ok(())
    }

    fn read_word(&self, word: u64) -> Result<u32> {
        check_word_index(word, self.word_count())?;
        let mut pipe = redis::pipe();
        for bit in 0..WORD_BITS {
            pipe.cmd("EXISTS").arg(self.bit_key(word * WORD_BITS + bit));
        }

        let mut conn = self.lock()?;
        let flags: Vec<bool> = pipe
            .query(&mut *conn)
            .map_err(|e| BloomError::Storage(format!("Redis error: {e}")))?;

        let mut value = 0u32;
        for (bit, &present) in flags.iter().enumerate() {
            if present {
                value |= 1 << bit;
            }
        }
        Ok(value)
    }

    fn write_word(&mut self, word: u64, value: u32) -> Result<()> {
        check_word_index(word, self.word_count())?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for bit in 0..WORD_BITS {
            let key = self.bit_key(word * WORD_BITS + bit);
            if value & (1 << bit) != 0 {
                pipe.cmd("SET").arg(key).arg(1u8).ignore();
            } else {
                pipe.cmd("DEL").arg(key).ignore();
            }
        }

        let mut conn = self.lock()?;
        let _: () = pipe
            .query(&mut *conn)
            .map_err(|e| BloomError::Storage(format!("Redis error: {e}")))?;
        Ok(())
    }
}
