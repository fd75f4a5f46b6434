#![cfg(feature = "sync")]

// Concurrent use under the `sync` feature.
//
// The invariants exercised:
// - Disjoint keys: threads working on their own keys in one shared map
//   see exactly their own writes, across growth events.
// - Shared pool: threads interning overlapping content agree on handles.
// - The global pool is one instance for the whole process.
use handle_pool::{IntMap, StrHandle, StrMap, StringPool};
use std::sync::Arc;
use std::thread;

const THREADS: i32 = 8;
const PER_THREAD: i32 = 2_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Test: interleaved insert/find/update/remove on disjoint keys.
// Assumes: key ranges do not overlap between threads; the map starts tiny
// so growth happens while other threads are active.
// Verifies: no lost updates and no entry observed half-written.
#[test]
fn disjoint_keys_no_lost_updates() {
    init_tracing();
    let map: Arc<IntMap<(i32, i32)>> = Arc::new(IntMap::with_capacity(4));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let base = t * PER_THREAD;
                for i in 0..PER_THREAD {
                    let k = base + i;
                    map.insert(k, (t, 0));
                    assert_eq!(map.find(k), Some((t, 0)));
                    assert!(map.update(k, (t, i)));
                    if i % 3 == 0 {
                        assert_eq!(map.remove(k), Some((t, i)));
                        assert_eq!(map.find(k), None);
                    }
                }
                for i in 0..PER_THREAD {
                    let expected = (i % 3 != 0).then_some((t, i));
                    assert_eq!(map.find(base + i), expected);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let survivors = (0..PER_THREAD).filter(|i| i % 3 != 0).count() * THREADS as usize;
    assert_eq!(map.len(), survivors);
}

// Test: a pool shared by threads interning overlapping vocabularies.
// Assumes: every thread interns the same words, in different orders.
// Verifies: all threads obtain identical handles for identical content.
#[test]
fn shared_pool_agrees_on_handles() {
    init_tracing();
    let pool = Arc::new(StringPool::new());
    let words: Vec<String> = (0..500).map(|i| format!("word-{i}")).collect();
    let words = Arc::new(words);

    let workers: Vec<_> = (0..THREADS as usize)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let words = Arc::clone(&words);
            thread::spawn(move || {
                let n = words.len();
                let mut handles = vec![StrHandle::EMPTY; n];
                for j in 0..n {
                    let idx = (j * 7 + t * 31) % n;
                    handles[idx] = pool.intern_str(&words[idx]);
                    // Derived strings exercise the scratch buffer concurrently.
                    let upper = pool.upper(handles[idx]);
                    assert_eq!(pool.text_lossy(upper), words[idx].to_uppercase());
                }
                handles
            })
        })
        .collect();

    let results: Vec<Vec<StrHandle>> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
    assert_eq!(pool.entry_count(), 1_000);
}

// Test: the process-wide pool across threads.
// Assumes: `sync` makes `global()` a single instance.
// Verifies: a handle interned on one thread resolves on another.
#[test]
fn global_pool_is_process_wide() {
    let h = thread::spawn(|| StringPool::global().intern_str("from another thread"))
        .join()
        .unwrap();
    assert_eq!(StringPool::global().text_lossy(h), "from another thread");
}

// Test: a StrMap used as a shared registry.
// Assumes: one pool and one map shared by all threads; each thread owns a
// disjoint set of names.
// Verifies: every registration is findable by content afterwards.
#[test]
fn shared_registry_by_name() {
    let pool = Arc::new(StringPool::new());
    let registry: Arc<StrMap<i32>> = Arc::new(StrMap::new());

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..200 {
                    let name = pool.format(format_args!("thread{t}-item{i}"));
                    registry.insert(name, t * 1_000 + i);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    for t in 0..THREADS {
        for i in 0..200 {
            let name = pool.intern_str(&format!("thread{t}-item{i}"));
            assert_eq!(registry.find(name), Some(t * 1_000 + i));
        }
    }
}
