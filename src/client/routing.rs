//! Key Router
//!
//! Deterministic key-to-shard mapping over a fixed, ordered shard list.

use crate::error::{KvError, Result};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over raw bytes. Stable across processes, platforms and releases.
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

// == Key Router ==
/// Maps a key to `fnv1a_32(key) % num_shards`.
///
/// Changing the shard count remaps most keys; there is no rebalancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRouter {
    num_shards: usize,
}

impl KeyRouter {
    /// Creates a router over `num_shards` shards. Zero shards is rejected.
    pub fn new(num_shards: usize) -> Result<Self> {
        if num_shards == 0 {
            return Err(KvError::InvalidRequest(
                "at least one shard is required".to_string(),
            ));
        }
        Ok(Self { num_shards })
    }

    /// Shard index for `key`, in `0..num_shards`.
    pub fn route(&self, key: &str) -> usize {
        fnv1a_32(key.as_bytes()) as usize % self.num_shards
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }
}
