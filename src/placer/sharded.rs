//! Sharded placement
//!
//! Spreads keys over nested subdirectories named after the hex CRC32 of
//! the key, so a large flat key space does not pile up in one directory.

use std::path::PathBuf;

use crate::error::{KvError, Result};

use super::Placer;

/// Hex digits available in a CRC32
const HASH_HEX_LEN: usize = 8;

/// Places `key` under `levels` shard directories of `width` hex digits
#[derive(Debug, Clone, Copy)]
pub struct ShardedPlacer {
    levels: usize,
    width: usize,
}

impl ShardedPlacer {
    /// Create a sharded placer
    ///
    /// `levels * width` must be between 1 and 8 (the CRC32 hex length).
    pub fn new(levels: usize, width: usize) -> Result<Self> {
        if levels == 0 || width == 0 {
            return Err(KvError::Config(
                "sharded placer needs at least one level of width >= 1".to_string(),
            ));
        }
        if levels * width > HASH_HEX_LEN {
            return Err(KvError::Config(format!(
                "sharded placer uses {} hex digits, only {} available",
                levels * width,
                HASH_HEX_LEN
            )));
        }
        Ok(Self { levels, width })
    }

    /// Shard directory names for `key`, outermost first
    pub fn shards(&self, key: &str) -> Vec<String> {
        let hash = format!("{:08x}", crc32fast::hash(key.as_bytes()));
        (0..self.levels)
            .map(|level| hash[level * self.width..(level + 1) * self.width].to_string())
            .collect()
    }
}

impl Default for ShardedPlacer {
    /// Two levels of two hex digits (256 × 256 directories)
    fn default() -> Self {
        Self { levels: 2, width: 2 }
    }
}

impl Placer for ShardedPlacer {
    fn resolve(&self, key: &str) -> PathBuf {
        let mut path: PathBuf = self.shards(key).into_iter().collect();
        path.push(key);
        path
    }
}
