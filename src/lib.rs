//! # filekv
//!
//! A persistent key-value store with one file per key:
//! - Pluggable record formats (JSON, YAML, bincode)
//! - Pluggable key → path placement (identity, sharded, closures)
//! - Per-key write locking; independent keys write in parallel
//! - Crash-atomic writes via temp file + rename
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │              write(key, v)      read(key)                   │
//! └──────┬───────────────────┬──────────────────┬───────────────┘
//!        │                   │                  │
//!        ▼                   ▼                  ▼
//!  ┌────────────┐     ┌─────────────┐    ┌─────────────┐
//!  │   Placer   │     │LockRegistry │    │  Marshaler  │
//!  │ key → path │     │ key → lock  │    │ v ↔ bytes   │
//!  └─────┬──────┘     └─────────────┘    └──────┬──────┘
//!        │                                      │
//!        └──────────────┬───────────────────────┘
//!                       ▼
//!        {base_dir}/{placer(key)}{ext}   (+ .tmp while writing)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use filekv::{Config, Store};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     r#type: String,
//! }
//!
//! # fn main() -> filekv::Result<()> {
//! let store = Store::open(Config::builder().base_dir("./data").build())?;
//! store.write("users/alice", &User { r#type: "admin".into() })?;
//! let alice: User = store.read("users/alice")?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod lock;
pub mod marshal;
pub mod placer;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, LockRetention, ReadConsistency, StaleTmpPolicy};
pub use error::{KvError, Result};
pub use lock::LockRegistry;
pub use marshal::{BincodeMarshaler, JsonMarshaler, Marshaler, YamlMarshaler};
pub use placer::{IdentityPlacer, Placer, ShardedPlacer};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of filekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
