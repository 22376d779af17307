//! Configuration for filekv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a filekv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all record files
    /// Internal structure:
    ///   {base_dir}/
    ///     ├── {placer(key)}{ext}        (one record per key)
    ///     └── {placer(key)}{ext}.tmp    (only while a write is in flight)
    pub base_dir: PathBuf,

    /// fsync the temp file before it is renamed into place
    pub sync_writes: bool,

    /// What to do with `.tmp` leftovers found when the store is opened
    pub stale_tmp_policy: StaleTmpPolicy,

    // -------------------------------------------------------------------------
    // Locking Configuration
    // -------------------------------------------------------------------------
    /// Whether per-key locks outlive their last holder
    pub lock_retention: LockRetention,

    /// Whether reads take the key's shared lock
    pub read_consistency: ReadConsistency,
}

/// Lifetime of per-key lock objects in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRetention {
    /// Keep one lock per distinct key for the life of the store.
    /// The registry grows with the key space.
    Retain,

    /// Drop a key's lock once no holder and no waiter references it
    EvictIdle,
}

/// Read isolation with respect to concurrent writes on the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConsistency {
    /// Reads take no lock; rename atomicity alone prevents torn reads
    Unlocked,

    /// Reads take the key's shared lock (multi-reader / single-writer)
    Shared,
}

/// Handling of temp files left behind by a crash between write and rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleTmpPolicy {
    /// Do not scan
    Ignore,

    /// Scan and log a warning per leftover file
    Warn,

    /// Scan and delete leftover files
    Remove,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./filekv_data"),
            sync_writes: true,
            stale_tmp_policy: StaleTmpPolicy::Warn,
            lock_retention: LockRetention::Retain,
            read_consistency: ReadConsistency::Unlocked,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base directory (root for all records)
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Enable or disable fsync of temp files before rename
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    /// Set the policy for leftover temp files
    pub fn stale_tmp_policy(mut self, policy: StaleTmpPolicy) -> Self {
        self.config.stale_tmp_policy = policy;
        self
    }

    /// Set the per-key lock retention
    pub fn lock_retention(mut self, retention: LockRetention) -> Self {
        self.config.lock_retention = retention;
        self
    }

    /// Set the read consistency mode
    pub fn read_consistency(mut self, consistency: ReadConsistency) -> Self {
        self.config.read_consistency = consistency;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
