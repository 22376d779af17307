//! Lock Registry Module
//!
//! Per-key mutual exclusion for writers.
//!
//! ## Responsibilities
//! - Hand out one lock object per key, created lazily
//! - Serialize lookup-or-insert behind a single guard lock
//! - Optionally evict a key's lock once nobody references it
//!
//! ## Lock Layout
//! ```text
//!   guard: Mutex ──► HashMap<String, Arc<RwLock<()>>>
//!                          │
//!        "users/alice" ────┼──► RwLock  (held across dir-ensure .. rename)
//!        "users/bob"   ────┘──► RwLock
//! ```
//!
//! The guard is only held for the O(1) map access, never while a
//! per-key lock is being waited on.

mod registry;

pub use registry::{KeyLock, LockRegistry};
