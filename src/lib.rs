//! handle-pool: an open-addressing hash table, a string interning pool
//! that hands out 32-bit handles, and typed maps built on the two.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one small storage engine reused by everything above it, with
//!   strings reduced to `Copy` handles so they can be map keys and record
//!   fields without lifetimes.
//! - Layers:
//!   - HashTable<K, V>: open-addressing engine over fixed-size keys. The
//!     caller supplies the 32-bit hash; keys compare byte-for-byte.
//!     Linear probing, tombstones on removal, doubling growth at a 0.8
//!     load limit.
//!   - StringPool: deduplicating byte-string store. Equal content always
//!     maps to the same `StrHandle`. Derived operations (trim, substrings,
//!     case mapping, numeric conversion, formatting) intern their results.
//!   - TypedMap<K, V>: `IntMap` and `StrMap` adapters that hash the key
//!     with a 32-bit integer mix and forward to a HashTable.
//! - Collaborators: `DynArray` (growable `Copy` sequence) and
//!   `ByteBuffer` (little-endian binary cursor with file load/save).
//!
//! Constraints
//! - Handles are 32 bits. The raw value `0` is the empty string in every
//!   pool; unknown or stale handles read as empty instead of failing.
//! - Items stored in typed maps are `Copy` payloads, copied in and out.
//! - Typed-map `insert` does not deduplicate; a repeated key is a second
//!   entry (see `typed_map`).
//!
//! Threading and reentrancy
//! - With the default `sync` feature, the pool and the typed maps hold a
//!   `parking_lot::Mutex` and lock it for the duration of each call. Both
//!   are `Send + Sync`; `StringPool::global()` is process-wide.
//! - Without `sync` they are single-threaded (`!Send`/`!Sync`), guarded by
//!   a debug-only reentrancy check, and `StringPool::global()` is one pool
//!   per thread.
//! - Either way no caller code runs while a container is locked: items are
//!   `Copy`, hashes are computed before locking, and `format` renders its
//!   arguments first.
//!
//! Hashing
//! - Table entries store their 32-bit hash; growth and tombstone purges
//!   reuse it and never touch the key. The pool likewise keeps each
//!   entry's 64-bit content hash for its index.
//!
//! Ref-counting
//! - Optional per pool (`PoolConfig::ref_counted`). Interning takes a
//!   reference, `release` drops one, and the last release frees the slot.
//!   Freed slots are recycled under a new generation carried in the high
//!   handle bits, so a stale handle does not resolve to a newer string.

pub mod array;
pub mod buffer;
pub mod error;
mod lock;
pub mod pool;
mod strings;
pub mod table;
mod table_proptest;
pub mod typed_map;

// Public surface
pub use array::DynArray;
pub use buffer::{ByteBuffer, Primitive};
pub use error::{BufferError, ConfigError};
pub use pool::{PoolConfig, StrHandle, StringPool};
pub use table::{HashTable, RawKey};
pub use typed_map::{IntMap, MapKey, StrMap, TypedMap};
