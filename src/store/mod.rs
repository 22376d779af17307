//! Store Module
//!
//! The atomic file store: one file per key, written through a temp file.
//!
//! ## Responsibilities
//! - Resolve keys to record paths via the Placer
//! - Serialize writes per key via the Lock Registry
//! - Make every record replacement crash-atomic (temp write + rename)
//! - Decode records via the Marshaler on read
//!
//! ## Write Path
//! ```text
//!  write(key, v)
//!    │ key empty? ──────────────► MissingKey
//!    │ placer.resolve(key) ─────► InvalidKey if it escapes base_dir
//!    ▼
//!  ┌────────── record lock held (exclusive) ────────────┐
//!  │ mkdir -p parent                                    │
//!  │ bytes = marshaler.marshal(v)                       │
//!  │ write bytes → {record}.tmp   (fsync if configured) │
//!  │ rename {record}.tmp → {record}                     │
//!  └────────────────────────────────────────────────────┘
//! ```
//!
//! Locks are keyed by the resolved record path, not the raw key, so
//! aliases such as `k`, `./k` and `k/` share one lock and one temp file.
//!
//! ## Limitations
//! Locks are in-memory and process-local. Two processes writing the same
//! key under one base directory are not serialized; rename atomicity
//! still prevents torn records.

mod paths;
mod recovery;

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::{Config, ReadConsistency, StaleTmpPolicy};
use crate::error::{KvError, Result};
use crate::lock::LockRegistry;
use crate::marshal::{JsonMarshaler, Marshaler};
use crate::placer::{IdentityPlacer, Placer};

pub use paths::TMP_SUFFIX;

/// Permissions for record and temp files (unix)
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// A persistent one-file-per-key store
///
/// ## Concurrency Model
///
/// - **Writes**: serialized per record path by the store's own
///   `LockRegistry`. Writes to different records run in parallel.
/// - **Reads**: lock-free by default. A read racing a write on the same
///   key sees either the old or the new complete record, with no
///   ordering guarantee. `ReadConsistency::Shared` makes reads take the
///   key's shared lock instead.
/// - All methods take `&self`; share a store across threads with `Arc`.
pub struct Store<M = JsonMarshaler, P = IdentityPlacer> {
    /// Store configuration
    config: Config,

    /// Absolute, cleaned root for all records
    base_dir: PathBuf,

    /// Record format
    marshaler: M,

    /// Key → relative path mapping
    placer: P,

    /// Per-key locks, owned by this store only
    locks: LockRegistry,
}

impl Store {
    /// Open a store with JSON records and identity placement
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(config, JsonMarshaler::default(), IdentityPlacer)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified base directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().base_dir(path).build())
    }
}

impl<M: Marshaler, P: Placer> Store<M, P> {
    /// Open or create a store with the given format and placement
    ///
    /// On startup:
    /// 1. Clean the base directory path and create it if missing
    /// 2. Apply the stale temp file policy
    ///
    /// Opening the same directory again is harmless and keeps all
    /// existing records.
    pub fn open_with(config: Config, marshaler: M, placer: P) -> Result<Self> {
        let base_dir = paths::clean_base_dir(&config.base_dir)?;

        if base_dir.is_dir() {
            debug!(dir = %base_dir.display(), "using existing storage folder");
        } else {
            debug!(dir = %base_dir.display(), "creating storage folder");
            paths::ensure_dir(&base_dir)?;
        }

        let locks = LockRegistry::new(config.lock_retention);
        let store = Self {
            config,
            base_dir,
            marshaler,
            placer,
            locks,
        };

        store.apply_stale_tmp_policy()?;

        Ok(store)
    }

    /// Write `value` as the record for `key`
    ///
    /// Steps:
    /// 1. Resolve the record path
    /// 2. Hold the record's lock exclusively until return
    /// 3. Create the parent directory
    /// 4. Marshal, write the temp file, rename it over the record
    ///
    /// On error the record keeps its previous content. A failed rename
    /// leaves the temp file behind.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        if key.is_empty() {
            return Err(KvError::MissingKey);
        }
        let record = self.record_path(key)?;

        let handle = self.locks.acquire(&lock_key(&record));
        let _guard = handle.write();

        self.write_record(&record, value)?;
        trace!(key, path = %record.display(), "record written");
        Ok(())
    }

    /// Read and decode the record for `key`
    ///
    /// Returns `KvError::NotFound` if the key has never been written.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        if key.is_empty() {
            return Err(KvError::MissingKey);
        }
        let record = self.record_path(key)?;

        let data = match self.config.read_consistency {
            ReadConsistency::Unlocked => Self::read_record(key, &record)?,
            ReadConsistency::Shared => {
                let handle = self.locks.acquire(&lock_key(&record));
                let _guard = handle.read();
                Self::read_record(key, &record)?
            }
        };

        trace!(key, bytes = data.len(), "record read");
        self.marshaler.unmarshal(&data)
    }

    /// Read the record for `key` into an existing value
    ///
    /// `out` is left untouched on error.
    pub fn read_into<T: DeserializeOwned>(&self, key: &str, out: &mut T) -> Result<()> {
        *out = self.read(key)?;
        Ok(())
    }

    /// The final on-disk path of `key`'s record
    pub fn record_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(KvError::MissingKey);
        }
        let placed = self.placer.resolve(key);
        let relative = paths::validate_relative(key, &placed)?;
        Ok(paths::record_path(
            &self.base_dir,
            &relative,
            self.marshaler.file_extension(),
        ))
    }

    /// Leftover temp files under the base directory, sorted
    pub fn scan_stale_tmp(&self) -> Result<Vec<PathBuf>> {
        recovery::find_stale_tmp(&self.base_dir, self.marshaler.file_extension())
    }

    /// Delete leftover temp files, returning how many were removed
    ///
    /// Only call this while no write is in flight in any process using
    /// the same base directory: an in-flight temp file looks stale too.
    pub fn remove_stale_tmp(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.scan_stale_tmp()? {
            match fs::remove_file(&path) {
                Ok(()) => {
                    warn!(path = %path.display(), "removed stale temp file");
                    removed += 1;
                }
                // Gone since the scan
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the absolute base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the record format
    pub fn marshaler(&self) -> &M {
        &self.marshaler
    }

    /// Get the key placement
    pub fn placer(&self) -> &P {
        &self.placer
    }

    /// Number of record paths with a lock object in the registry
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Temp write + rename (called with the key lock held)
    fn write_record<T: Serialize + ?Sized>(&self, record: &Path, value: &T) -> Result<()> {
        let parent = record.parent().unwrap_or(&self.base_dir);
        paths::ensure_dir(parent)?;

        let data = self.marshaler.marshal(value)?;

        let tmp = paths::tmp_path(record);
        self.write_tmp(&tmp, &data)?;

        if let Err(e) = fs::rename(&tmp, record) {
            warn!(tmp = %tmp.display(), error = %e, "rename failed, temp file left behind");
            return Err(e.into());
        }

        if self.config.sync_writes {
            sync_dir(parent)?;
        }
        Ok(())
    }

    fn write_tmp(&self, tmp: &Path, data: &[u8]) -> Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }

        let mut file = options.open(tmp)?;
        file.write_all(data)?;
        if self.config.sync_writes {
            file.sync_all()?;
        }
        Ok(())
    }

    fn read_record(key: &str, record: &Path) -> Result<Vec<u8>> {
        fs::read(record).map_err(|e| match e.kind() {
            ErrorKind::NotFound => KvError::NotFound {
                key: key.to_string(),
                path: record.to_path_buf(),
            },
            _ => KvError::Io(e),
        })
    }

    fn apply_stale_tmp_policy(&self) -> Result<()> {
        match self.config.stale_tmp_policy {
            StaleTmpPolicy::Ignore => {}
            StaleTmpPolicy::Warn => {
                let stale = recovery::find_stale_tmp_lenient(
                    &self.base_dir,
                    self.marshaler.file_extension(),
                );
                for path in stale {
                    warn!(path = %path.display(), "stale temp file from an interrupted write");
                }
            }
            StaleTmpPolicy::Remove => {
                self.remove_stale_tmp()?;
            }
        }
        Ok(())
    }
}

/// Registry key for a record: its full path, so every key alias of one
/// file maps to one lock. Lossy conversion can only merge distinct
/// non-UTF-8 paths onto one lock, never split one path across two.
fn lock_key(record: &Path) -> String {
    record.to_string_lossy().into_owned()
}

/// Persist the rename itself by syncing the containing directory
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
