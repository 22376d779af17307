//! Concurrency tests for Store
//!
//! These tests verify:
//! - Same-key writes are serialized
//! - Distinct-key writes run in parallel
//! - Readers never observe torn records
//! - Unlocked vs shared read consistency during an in-flight write

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use filekv::{
    Config, IdentityPlacer, JsonMarshaler, KvError, Marshaler, ReadConsistency, Store,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Blob {
    writer: usize,
    payload: String,
}

// =============================================================================
// Instrumented Marshalers
// =============================================================================

/// Counts callers inside `marshal` and optionally sleeps there
#[derive(Clone, Default)]
struct CountingMarshaler {
    inner: JsonMarshaler,
    delay: Duration,
    inside: Arc<AtomicUsize>,
    max_inside: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl CountingMarshaler {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl Marshaler for CountingMarshaler {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> filekv::Result<Vec<u8>> {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        let result = self.inner.marshal(value);
        self.inside.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> filekv::Result<T> {
        self.inner.unmarshal(bytes)
    }

    fn file_extension(&self) -> &str {
        self.inner.file_extension()
    }
}

/// Parks every `marshal` call until `release` is set
#[derive(Clone, Default)]
struct GateMarshaler {
    inner: JsonMarshaler,
    arrived: Arc<AtomicUsize>,
    release: Arc<AtomicBool>,
}

impl Marshaler for GateMarshaler {
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> filekv::Result<Vec<u8>> {
        self.arrived.fetch_add(1, Ordering::SeqCst);
        wait_until(Duration::from_secs(5), || self.release.load(Ordering::SeqCst));
        self.inner.marshal(value)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> filekv::Result<T> {
        self.inner.unmarshal(bytes)
    }

    fn file_extension(&self) -> &str {
        self.inner.file_extension()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

fn config_for(temp: &TempDir) -> Config {
    Config::builder()
        .base_dir(temp.path())
        .sync_writes(false)
        .build()
}

fn blob(writer: usize) -> Blob {
    // Large enough that a torn read would be likely if writes were in place
    Blob {
        writer,
        payload: format!("{:04}", writer).repeat(16 * 1024),
    }
}

// =============================================================================
// Same-Key Serialization Tests
// =============================================================================

#[test]
fn test_same_key_writes_are_serialized() {
    let temp = TempDir::new().unwrap();
    let counter = CountingMarshaler::with_delay(Duration::from_millis(2));
    let store = Store::open_with(config_for(&temp), counter.clone(), IdentityPlacer).unwrap();

    crossbeam::scope(|s| {
        for t in 0..8 {
            let store = &store;
            s.spawn(move |_| {
                for i in 0..10 {
                    store.write("hot/key", &(t * 100 + i)).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(counter.max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 80);

    let last: usize = store.read("hot/key").unwrap();
    assert!(last % 100 < 10 && last / 100 < 8);
    assert!(store.scan_stale_tmp().unwrap().is_empty());
}

#[test]
fn test_concurrent_writers_leave_one_complete_value() {
    let temp = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp)).unwrap();
    let done = AtomicBool::new(false);
    let reads = AtomicUsize::new(0);

    crossbeam::scope(|s| {
        let store = &store;
        let done = &done;
        let reads = &reads;

        let writers: Vec<_> = (0..4)
            .map(|t| {
                s.spawn(move |_| {
                    for _ in 0..20 {
                        store.write("shared", &blob(t)).unwrap();
                    }
                })
            })
            .collect();

        // Readers race the writers; every successful read must be whole
        for _ in 0..2 {
            s.spawn(move |_| {
                while !done.load(Ordering::SeqCst) {
                    match store.read::<Blob>("shared") {
                        Ok(value) => {
                            assert!(value.writer < 4);
                            assert_eq!(value, blob(value.writer));
                            reads.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => assert!(e.is_not_found(), "torn or failed read: {e}"),
                    }
                }
            });
        }

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
    })
    .unwrap();

    let final_value: Blob = store.read("shared").unwrap();
    assert_eq!(final_value, blob(final_value.writer));
    assert!(store.scan_stale_tmp().unwrap().is_empty());
}

#[test]
fn test_aliasing_keys_share_one_lock() {
    let temp = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp)).unwrap();

    for key in ["k", "./k", "k/", "a/b", "a//b", "a/./b"] {
        store.write(key, &key).unwrap();
    }

    // One lock per record file, not per spelling of the key
    assert_eq!(store.lock_count(), 2);
}

#[test]
fn test_aliasing_keys_never_tear_records() {
    let temp = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp)).unwrap();
    let long = "a".repeat(256 * 1024);
    let short = "b".repeat(256);
    let done = AtomicBool::new(false);

    crossbeam::scope(|s| {
        let store = &store;
        let done = &done;
        let (long, short) = (&long, &short);

        let writers = vec![
            s.spawn(move |_| {
                for _ in 0..200 {
                    store.write("k", long).unwrap();
                }
            }),
            s.spawn(move |_| {
                for _ in 0..200 {
                    store.write("./k", short).unwrap();
                }
            }),
        ];

        s.spawn(move |_| {
            while !done.load(Ordering::SeqCst) {
                match store.read::<String>("k") {
                    Ok(value) => assert!(value == *long || value == *short, "torn record"),
                    Err(e) => assert!(e.is_not_found(), "undecodable record: {e}"),
                }
            }
        });

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
    })
    .unwrap();

    let last: String = store.read("k/").unwrap();
    assert!(last == long || last == short);
    assert!(store.scan_stale_tmp().unwrap().is_empty());
}

// =============================================================================
// Independence Tests
// =============================================================================

#[test]
fn test_distinct_keys_write_in_parallel() {
    let temp = TempDir::new().unwrap();
    let gate = GateMarshaler::default();
    let store = Store::open_with(config_for(&temp), gate.clone(), IdentityPlacer).unwrap();

    crossbeam::scope(|s| {
        let store = &store;
        for key in ["left", "right"] {
            s.spawn(move |_| store.write(key, &key).unwrap());
        }

        // Both writers must reach the marshaler while neither has finished
        let both_inside = wait_until(Duration::from_secs(5), || {
            gate.arrived.load(Ordering::SeqCst) == 2
        });
        gate.release.store(true, Ordering::SeqCst);
        assert!(both_inside, "writes to distinct keys blocked each other");
    })
    .unwrap();

    assert_eq!(store.read::<String>("left").unwrap(), "left");
    assert_eq!(store.read::<String>("right").unwrap(), "right");
}

#[test]
fn test_distinct_keys_total_time_near_slowest_write() {
    let temp = TempDir::new().unwrap();
    let counter = CountingMarshaler::with_delay(Duration::from_millis(200));
    let store = Arc::new(Store::open_with(config_for(&temp), counter.clone(), IdentityPlacer).unwrap());

    let started = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.write(&format!("key{}", i), &i).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let elapsed = started.elapsed();

    // Serialized writes would need at least 800ms
    assert!(elapsed < Duration::from_millis(700), "took {:?}", elapsed);
    assert!(counter.max_inside.load(Ordering::SeqCst) >= 2);
}

// =============================================================================
// Read Consistency Tests
// =============================================================================

#[test]
fn test_unlocked_read_does_not_wait_for_writer() {
    let temp = TempDir::new().unwrap();
    let gate = GateMarshaler::default();
    let store = Store::open_with(config_for(&temp), gate.clone(), IdentityPlacer).unwrap();

    crossbeam::scope(|s| {
        let store = &store;
        let writer = s.spawn(move |_| store.write("k", &"new").unwrap());

        assert!(wait_until(Duration::from_secs(5), || {
            gate.arrived.load(Ordering::SeqCst) == 1
        }));

        // The write holds the key lock but has not renamed anything yet
        let err = store.read::<String>("k").unwrap_err();
        assert!(matches!(err, KvError::NotFound { .. }));

        gate.release.store(true, Ordering::SeqCst);
        writer.join().unwrap();
    })
    .unwrap();

    assert_eq!(store.read::<String>("k").unwrap(), "new");
}

#[test]
fn test_shared_read_waits_for_writer() {
    let temp = TempDir::new().unwrap();
    let gate = GateMarshaler::default();
    let config = Config::builder()
        .base_dir(temp.path())
        .sync_writes(false)
        .read_consistency(ReadConsistency::Shared)
        .build();
    let store = Store::open_with(config, gate.clone(), IdentityPlacer).unwrap();
    let read_done = AtomicBool::new(false);

    crossbeam::scope(|s| {
        let store = &store;
        let read_done = &read_done;
        let writer = s.spawn(move |_| store.write("k", &"new").unwrap());

        assert!(wait_until(Duration::from_secs(5), || {
            gate.arrived.load(Ordering::SeqCst) == 1
        }));

        let reader = s.spawn(move |_| {
            let value = store.read::<String>("k");
            read_done.store(true, Ordering::SeqCst);
            value
        });

        thread::sleep(Duration::from_millis(100));
        assert!(!read_done.load(Ordering::SeqCst), "shared read did not wait");

        gate.release.store(true, Ordering::SeqCst);
        writer.join().unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), "new");
    })
    .unwrap();
}
