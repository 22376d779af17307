//! Identity placement: the key is the path

use std::path::PathBuf;

use super::Placer;

/// Places each record at the path spelled by its key
///
/// Keys containing `/` land in subdirectories, e.g. `users/alice`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPlacer;

impl Placer for IdentityPlacer {
    fn resolve(&self, key: &str) -> PathBuf {
        PathBuf::from(key)
    }
}
