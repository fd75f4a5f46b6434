//! HashTable: open-addressing engine over fixed-size keys.
//!
//! The caller supplies a 32-bit hash for every operation; the table never
//! hashes keys itself. Keys are compared byte-for-byte through `RawKey`, so
//! two keys are equal exactly when their fixed-size representations are.
//!
//! Slots are probed linearly from `hash & (capacity - 1)`. Removal leaves a
//! tombstone, which keeps later entries of the same cluster reachable and is
//! reused by the next insert that probes over it. Tombstones are dropped only
//! when the table is rehashed.

use core::mem::size_of;
use tracing::debug;

/// Default slot count used by `HashTable::new` and the typed maps.
pub const DEFAULT_CAPACITY: usize = 256;

// Live entries may occupy at most LOAD_NUM / LOAD_DEN of the slots.
const LOAD_NUM: usize = 4;
const LOAD_DEN: usize = 5;

/// A key with a fixed-size byte representation used for equality.
pub trait RawKey: Copy {
    /// Byte image of the key, `size_of::<Self>()` bytes long.
    type Bytes: AsRef<[u8]>;

    fn to_key_bytes(&self) -> Self::Bytes;
}

macro_rules! raw_key_for_int {
    ($($t:ty),*) => {$(
        impl RawKey for $t {
            type Bytes = [u8; size_of::<$t>()];
            #[inline]
            fn to_key_bytes(&self) -> Self::Bytes {
                self.to_ne_bytes()
            }
        }
    )*};
}

raw_key_for_int!(i32, u32, i64, u64);

#[inline]
fn same_key<K: RawKey>(a: &K, b: &K) -> bool {
    a.to_key_bytes().as_ref() == b.to_key_bytes().as_ref()
}

#[derive(Clone, Debug)]
enum Slot<K, V> {
    Empty,
    Occupied { hash: u32, key: K, item: V },
    Tombstone,
}

/// Open-addressing hash table with tombstones and doubling growth.
///
/// Duplicate keys are not rejected: `insert` always adds an entry, and
/// `find`/`find_mut`/`remove` act on the first match along the probe
/// sequence. Callers that need unique keys check before inserting.
#[derive(Clone, Debug)]
pub struct HashTable<K, V> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
    rehashes: usize,
}

impl<K: RawKey, V> Default for HashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RawKey, V> HashTable<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty table with `initial_capacity` rounded up to a power
    /// of two (at least one slot).
    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(1).next_power_of_two();
        Self {
            slots: empty_slots(capacity),
            len: 0,
            tombstones: 0,
            rehashes: 0,
        }
    }

    /// Width in bytes of every key in this table.
    pub const fn key_size(&self) -> usize {
        size_of::<K>()
    }

    /// Width in bytes of every item in this table.
    pub const fn item_size(&self) -> usize {
        size_of::<V>()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of full rehashes (growth or tombstone purge) so far.
    pub fn rehash_count(&self) -> usize {
        self.rehashes
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    fn threshold(capacity: usize) -> usize {
        capacity * LOAD_NUM / LOAD_DEN
    }

    /// Slot index of the first live entry matching `key`. At most
    /// `capacity` slots are probed, so a table without any `Empty` slot
    /// still terminates.
    fn locate(&self, hash: u32, key: &K) -> Option<usize> {
        let mask = self.mask();
        let mut pos = hash as usize & mask;
        for _ in 0..self.slots.len() {
            match &self.slots[pos] {
                Slot::Empty => return None,
                Slot::Occupied { hash: h, key: k, .. } if *h == hash && same_key(k, key) => {
                    return Some(pos);
                }
                _ => {}
            }
            pos = (pos + 1) & mask;
        }
        None
    }

    /// First `Empty` or `Tombstone` slot on the probe sequence of `hash`.
    fn vacancy(&self, hash: u32) -> usize {
        let mask = self.mask();
        let mut pos = hash as usize & mask;
        // The load threshold keeps at least one non-live slot around.
        loop {
            match self.slots[pos] {
                Slot::Empty | Slot::Tombstone => return pos,
                Slot::Occupied { .. } => pos = (pos + 1) & mask,
            }
        }
    }

    /// Add an entry. Does not look for an existing equal key.
    pub fn insert(&mut self, hash: u32, key: K, item: V) {
        self.reserve_one();
        let pos = self.vacancy(hash);
        if matches!(self.slots[pos], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[pos] = Slot::Occupied { hash, key, item };
        self.len += 1;
    }

    pub fn find(&self, hash: u32, key: &K) -> Option<&V> {
        let pos = self.locate(hash, key)?;
        match &self.slots[pos] {
            Slot::Occupied { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Mutable access to the item of the first entry matching `key`. The key
    /// itself stays immutable.
    pub fn find_mut(&mut self, hash: u32, key: &K) -> Option<&mut V> {
        let pos = self.locate(hash, key)?;
        match &mut self.slots[pos] {
            Slot::Occupied { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn contains_key(&self, hash: u32, key: &K) -> bool {
        self.locate(hash, key).is_some()
    }

    /// Remove the first entry matching `key`, leaving a tombstone.
    pub fn remove(&mut self, hash: u32, key: &K) -> Option<V> {
        let pos = self.locate(hash, key)?;
        match core::mem::replace(&mut self.slots[pos], Slot::Tombstone) {
            Slot::Occupied { item, .. } => {
                self.len -= 1;
                self.tombstones += 1;
                Some(item)
            }
            // `locate` only returns occupied positions.
            other => {
                self.slots[pos] = other;
                None
            }
        }
    }

    /// Drop every entry; capacity is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.len = 0;
        self.tombstones = 0;
    }

    /// Live entries in slot order as `(hash, key, item)`.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }

    /// Make room for one more entry, rehashing once live entries plus
    /// tombstones would break the load limit. Tombstones are purged in place
    /// only while less than half the slots are live; otherwise the table
    /// doubles, so
    /// churn near the limit does not rehash on every other insert.
    fn reserve_one(&mut self) {
        let capacity = self.capacity();
        if self.len + self.tombstones < Self::threshold(capacity) {
            return;
        }
        if self.len < capacity / 2 {
            debug!(
                capacity,
                live = self.len,
                tombstones = self.tombstones,
                "hash table tombstone purge"
            );
            self.rehash(capacity);
            return;
        }
        let mut new_capacity = capacity * 2;
        while self.len + 1 > Self::threshold(new_capacity) {
            new_capacity *= 2;
        }
        debug!(
            from = capacity,
            to = new_capacity,
            live = self.len,
            tombstones = self.tombstones,
            "hash table growth"
        );
        self.rehash(new_capacity);
    }

    /// Move every live entry into fresh storage of `capacity` slots using
    /// the stored hashes. Tombstones are not carried over.
    fn rehash(&mut self, capacity: usize) {
        let old = core::mem::replace(&mut self.slots, empty_slots(capacity));
        self.tombstones = 0;
        self.rehashes += 1;
        for slot in old {
            if let Slot::Occupied { hash, key, item } = slot {
                let pos = self.vacancy(hash);
                self.slots[pos] = Slot::Occupied { hash, key, item };
            }
        }
    }
}

fn empty_slots<K, V>(capacity: usize) -> Vec<Slot<K, V>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}

/// Iterator over live entries of a `HashTable`.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Slot<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (u32, &'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.it.by_ref() {
            if let Slot::Occupied { hash, key, item } = slot {
                return Some((*hash, key, item));
            }
        }
        None
    }
}
