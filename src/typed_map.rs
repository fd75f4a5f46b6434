//! Typed maps: `IntMap` and `StrMap` over the open-addressing `HashTable`.
//!
//! A typed map only computes the dispersion hash of its key and forwards to
//! the table; all storage logic stays in `crate::table`. Items are `Copy`
//! payloads copied in on `insert`/`update` and copied out on `find`.
//!
//! Caller contract: `insert` does not check for an existing entry. Inserting
//! a key twice stores two entries; `find`, `update` and `remove` then act on
//! the first one. Use `update` (or `contains_key` first) for upsert behaviour,
//! and serialize the two calls yourself if other threads share the map.

use crate::lock::Lock;
use crate::pool::StrHandle;
use crate::table::{HashTable, RawKey, DEFAULT_CAPACITY};
use core::mem::size_of;

/// 32-bit avalanche mix (Thomas Wang). A bijection on `u32`.
#[inline]
pub const fn mix32(mut key: u32) -> u32 {
    key = (!key).wrapping_add(key << 15);
    key ^= key >> 12;
    key = key.wrapping_add(key << 2);
    key ^= key >> 4;
    key = key.wrapping_add(key << 3).wrapping_add(key << 11);
    key ^= key >> 16;
    key
}

/// A key type usable in a `TypedMap`.
pub trait MapKey: RawKey {
    fn dispersion_hash(&self) -> u32;
}

impl MapKey for i32 {
    #[inline]
    fn dispersion_hash(&self) -> u32 {
        mix32(*self as u32)
    }
}

impl MapKey for StrHandle {
    #[inline]
    fn dispersion_hash(&self) -> u32 {
        mix32(self.to_raw())
    }
}

/// Map from a fixed-size key to a `Copy` item, one `HashTable` underneath.
pub struct TypedMap<K, V> {
    table: Lock<HashTable<K, V>>,
}

/// Map keyed by `i32`.
pub type IntMap<V> = TypedMap<i32, V>;

/// Map keyed by interned string handles.
pub type StrMap<V> = TypedMap<StrHandle, V>;

impl<K: MapKey, V: Copy> Default for TypedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MapKey, V: Copy> TypedMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            table: Lock::new(HashTable::with_capacity(initial_capacity)),
        }
    }

    pub const fn item_size(&self) -> usize {
        size_of::<V>()
    }

    pub fn len(&self) -> usize {
        self.table.with(|t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.table.with(|t| t.is_empty())
    }

    pub fn clear(&self) {
        self.table.with(|t| t.clear());
    }

    /// Add an entry. Does not replace an existing entry for `key`.
    pub fn insert(&self, key: K, item: V) {
        let hash = key.dispersion_hash();
        self.table.with(|t| t.insert(hash, key, item));
    }

    /// Remove the first entry for `key`, returning its item.
    pub fn remove(&self, key: K) -> Option<V> {
        let hash = key.dispersion_hash();
        self.table.with(|t| t.remove(hash, &key))
    }

    /// Overwrite the item of an existing entry. Never creates an entry.
    pub fn update(&self, key: K, item: V) -> bool {
        let hash = key.dispersion_hash();
        self.table.with(|t| match t.find_mut(hash, &key) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        })
    }

    /// Copy of the item stored for `key`.
    pub fn find(&self, key: K) -> Option<V> {
        let hash = key.dispersion_hash();
        self.table.with(|t| t.find(hash, &key).copied())
    }

    pub fn contains_key(&self, key: K) -> bool {
        let hash = key.dispersion_hash();
        self.table.with(|t| t.contains_key(hash, &key))
    }

    /// In-place access to the item stored for `key`. The exclusive borrow
    /// rules out other users, so no lock is taken.
    pub fn find_mut(&mut self, key: K) -> Option<&mut V> {
        let hash = key.dispersion_hash();
        self.table.get_mut().find_mut(hash, &key)
    }

    /// Slot count of the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.with(|t| t.capacity())
    }
}
