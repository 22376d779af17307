//! Placer Module
//!
//! Maps logical keys to record paths relative to the base directory.
//!
//! ## Placement Strategies
//! ```text
//!   IdentityPlacer            "users/alice" → users/alice
//!   ShardedPlacer(2, 2)       "users/alice" → 3f/a1/users/alice
//!   |key| custom(key)         any Fn(&str) -> PathBuf
//! ```
//!
//! The store rejects placed paths that are empty, absolute, or climb out
//! of the base directory with `..`.

mod identity;
mod sharded;

use std::path::PathBuf;

pub use identity::IdentityPlacer;
pub use sharded::ShardedPlacer;

/// Resolves a key to a relative record path (without extension)
pub trait Placer: Send + Sync {
    fn resolve(&self, key: &str) -> PathBuf;
}

impl<F> Placer for F
where
    F: Fn(&str) -> PathBuf + Send + Sync,
{
    fn resolve(&self, key: &str) -> PathBuf {
        self(key)
    }
}
