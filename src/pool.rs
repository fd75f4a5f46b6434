//! StringPool: content-addressed string storage behind 32-bit handles.
//!
//! Interning the same bytes twice yields the same `StrHandle`. Payloads are
//! stored once, behind an `Arc<[u8]>`, and indexed by a precomputed content
//! hash in a `hashbrown::HashTable` of slot numbers; the stored hash is what
//! the index rehashes with, so content is hashed exactly once per entry.
//!
//! Handle layout: the low `index_bits` hold `slot + 1` (so the raw value `0`
//! is never a stored entry and doubles as the empty string), the remaining
//! high bits hold the slot's generation. Without ref-counting the whole
//! 32 bits are index and entries live as long as the pool. With
//! ref-counting a slot freed by `release` is recycled under the next
//! generation, so stale handles stop resolving instead of aliasing.
//!
//! Lookups never fail: unknown or stale handles read as the empty string
//! with length 0. Handles carry no pool identity, so a handle from another
//! pool resolves to whatever that slot holds here.

use crate::error::ConfigError;
use crate::lock::Lock;
use crate::table::RawKey;
use core::hash::BuildHasher;
use hashbrown::HashTable as ContentIndex;
use std::collections::hash_map::RandomState;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default initial size of the scratch buffer used by derived operations.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 256;

const MAX_GENERATION_BITS: u32 = 16;

/// Handle to an interned string. Small, `Copy`, and meaningful only
/// together with the pool that issued it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrHandle(u32);

impl StrHandle {
    /// The empty string. Valid in every pool.
    pub const EMPTY: StrHandle = StrHandle(0);

    pub const fn from_raw(raw: u32) -> Self {
        StrHandle(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    pub const fn is_empty_handle(self) -> bool {
        self.0 == 0
    }
}

impl RawKey for StrHandle {
    type Bytes = [u8; 4];

    #[inline]
    fn to_key_bytes(&self) -> Self::Bytes {
        self.0.to_ne_bytes()
    }
}

/// Construction-time settings for a `StringPool`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Count references per entry and free entries whose count drops to zero.
    pub ref_counted: bool,
    /// High handle bits reserved for slot generations. Only used when
    /// `ref_counted` is set.
    pub generation_bits: u32,
    /// Initial size of the scratch buffer.
    pub scratch_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            ref_counted: false,
            generation_bits: 8,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ref_counted && !(1..=MAX_GENERATION_BITS).contains(&self.generation_bits) {
            return Err(ConfigError::GenerationBits {
                got: self.generation_bits,
                max: MAX_GENERATION_BITS,
            });
        }
        if self.scratch_capacity == 0 {
            return Err(ConfigError::ZeroScratch);
        }
        Ok(())
    }

    fn index_bits(&self) -> u32 {
        if self.ref_counted {
            32 - self.generation_bits
        } else {
            32
        }
    }
}

#[derive(Debug)]
struct Entry {
    payload: Option<Arc<[u8]>>, // None while the slot is on the free list
    hash: u64,
    generation: u32,
    refs: u32,
}

/// Staging area for derived strings. Grows by doubling, never shrinks.
#[derive(Debug)]
struct Scratch {
    buf: Vec<u8>,
}

impl Scratch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Lend out the buffer, cleared and able to hold `required` bytes.
    fn take(&mut self, required: usize) -> Vec<u8> {
        let mut buf = core::mem::take(&mut self.buf);
        buf.clear();
        let capacity = buf.capacity();
        if capacity < required {
            let mut grown = capacity.max(1);
            while grown < required {
                grown *= 2;
            }
            buf.reserve_exact(grown);
            debug!(from = capacity, to = grown, "string pool scratch growth");
        }
        buf
    }

    fn restore(&mut self, buf: Vec<u8>) {
        self.buf = buf;
    }
}

pub(crate) struct PoolState {
    config: PoolConfig,
    index_bits: u32,
    hasher: RandomState,
    index: ContentIndex<u32>,
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
    scratch: Scratch,
    empty: Arc<[u8]>,
}

impl PoolState {
    fn new(config: PoolConfig) -> Self {
        debug!(
            ref_counted = config.ref_counted,
            index_bits = config.index_bits(),
            "string pool created"
        );
        Self {
            config,
            index_bits: config.index_bits(),
            hasher: RandomState::new(),
            index: ContentIndex::new(),
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
            scratch: Scratch::with_capacity(config.scratch_capacity),
            empty: Arc::from(&[][..]),
        }
    }

    fn index_mask(&self) -> u32 {
        u32::MAX.checked_shr(32 - self.index_bits).unwrap_or(0)
    }

    fn generation_mask(&self) -> u32 {
        u32::MAX.checked_shr(self.index_bits).unwrap_or(0)
    }

    fn encode(&self, slot: usize, generation: u32) -> StrHandle {
        // `slot + 1` fits under the index mask, checked in `allocate`.
        let low = slot as u32 + 1;
        let high = generation.checked_shl(self.index_bits).unwrap_or(0);
        StrHandle(high | low)
    }

    /// Slot of a handle that currently resolves to a stored entry.
    fn decode(&self, handle: StrHandle) -> Option<usize> {
        let low = handle.0 & self.index_mask();
        if low == 0 {
            return None;
        }
        let generation = handle.0.checked_shr(self.index_bits).unwrap_or(0);
        let slot = (low - 1) as usize;
        let entry = self.entries.get(slot)?;
        (entry.payload.is_some() && entry.generation == generation).then_some(slot)
    }

    pub(crate) fn bytes(&self, handle: StrHandle) -> &[u8] {
        self.decode(handle)
            .and_then(|slot| self.entries[slot].payload.as_deref())
            .unwrap_or(&[])
    }

    pub(crate) fn length(&self, handle: StrHandle) -> usize {
        self.bytes(handle).len()
    }

    fn shared(&self, handle: StrHandle) -> Arc<[u8]> {
        self.decode(handle)
            .and_then(|slot| self.entries[slot].payload.clone())
            .unwrap_or_else(|| self.empty.clone())
    }

    fn handle_of(&self, slot: usize) -> StrHandle {
        self.encode(slot, self.entries[slot].generation)
    }

    pub(crate) fn intern(&mut self, bytes: &[u8]) -> StrHandle {
        if bytes.is_empty() {
            return StrHandle::EMPTY;
        }
        let hash = self.hasher.hash_one(bytes);
        let entries = &self.entries;
        let found = self.index.find(hash, |&slot| {
            let e = &entries[slot as usize];
            e.hash == hash && e.payload.as_deref() == Some(bytes)
        });
        if let Some(&slot) = found {
            let slot = slot as usize;
            if self.config.ref_counted {
                self.add_ref(slot);
            }
            return self.handle_of(slot);
        }

        let slot = self.allocate();
        let entry = &mut self.entries[slot];
        entry.payload = Some(Arc::from(bytes));
        entry.hash = hash;
        entry.refs = u32::from(self.config.ref_counted);
        let entries = &self.entries;
        let _ = self
            .index
            .insert_unique(hash, slot as u32, |&s| entries[s as usize].hash);
        self.live += 1;
        self.handle_of(slot)
    }

    /// A free slot, recycled or appended.
    fn allocate(&mut self) -> usize {
        if let Some(slot) = self.free.pop() {
            return slot as usize;
        }
        let slot = self.entries.len();
        // Slot numbers are stored as `slot + 1` under the index mask.
        if slot as u64 + 1 > u64::from(self.index_mask()) {
            panic!(
                "string pool handle space exhausted: {} slots with {} index bits",
                slot, self.index_bits
            );
        }
        self.entries.push(Entry {
            payload: None,
            hash: 0,
            generation: 0,
            refs: 0,
        });
        slot
    }

    fn add_ref(&mut self, slot: usize) {
        let entry = &mut self.entries[slot];
        match entry.refs.checked_add(1) {
            Some(n) => entry.refs = n,
            // Same policy as `Rc`: an overflowing count cannot be trusted.
            None => std::process::abort(),
        }
    }

    pub(crate) fn retain(&mut self, handle: StrHandle) -> bool {
        let Some(slot) = self.decode(handle) else {
            return handle.is_empty_handle();
        };
        if self.config.ref_counted {
            self.add_ref(slot);
        }
        true
    }

    pub(crate) fn release(&mut self, handle: StrHandle) -> bool {
        let Some(slot) = self.decode(handle) else {
            return handle.is_empty_handle();
        };
        if !self.config.ref_counted {
            return true;
        }
        let generation_mask = self.generation_mask();
        let entry = &mut self.entries[slot];
        entry.refs -= 1;
        if entry.refs > 0 {
            return true;
        }

        let hash = entry.hash;
        entry.payload = None;
        entry.generation = (entry.generation + 1) & generation_mask;
        if let Ok(found) = self.index.find_entry(hash, |&s| s as usize == slot) {
            let _ = found.remove();
        }
        self.free.push(slot as u32);
        self.live -= 1;
        trace!(slot, "string pool entry freed");
        true
    }
}

/// Deduplicating string storage issuing `StrHandle`s.
///
/// All operations take `&self` and lock the pool for their own duration
/// (see the `sync` feature). Derived string operations live in
/// `crate::strings`.
pub struct StringPool {
    pub(crate) state: Lock<PoolState>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for StringPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.state.with(|s| {
            f.debug_struct("StringPool")
                .field("config", &s.config)
                .field("entries", &s.live)
                .finish()
        })
    }
}

impl StringPool {
    pub fn new() -> Self {
        Self {
            state: Lock::new(PoolState::new(PoolConfig::default())),
        }
    }

    pub fn with_config(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Lock::new(PoolState::new(config)),
        })
    }

    /// The process-wide pool, created on first use and kept until exit.
    #[cfg(feature = "sync")]
    pub fn global() -> &'static StringPool {
        static GLOBAL: std::sync::OnceLock<StringPool> = std::sync::OnceLock::new();
        GLOBAL.get_or_init(|| {
            debug!("global string pool initialized");
            StringPool::new()
        })
    }

    /// The pool shared by everything on this thread, created on first use
    /// and kept until exit. Without `sync` a pool cannot cross threads, so
    /// each thread gets its own.
    #[cfg(not(feature = "sync"))]
    pub fn global() -> &'static StringPool {
        use std::cell::OnceCell;
        thread_local! {
            static GLOBAL: OnceCell<&'static StringPool> = const { OnceCell::new() };
        }
        GLOBAL.with(|cell| {
            *cell.get_or_init(|| {
                debug!("thread-local string pool initialized");
                Box::leak(Box::new(StringPool::new()))
            })
        })
    }

    pub fn config(&self) -> PoolConfig {
        self.state.with(|s| s.config)
    }

    /// Handle for `bytes`, storing a copy if the content is new.
    pub fn intern(&self, bytes: &[u8]) -> StrHandle {
        self.state.with(|s| s.intern(bytes))
    }

    pub fn intern_str(&self, text: &str) -> StrHandle {
        self.intern(text.as_bytes())
    }

    /// Shared view of the handle's bytes; empty for unknown handles.
    pub fn text_of(&self, handle: StrHandle) -> Arc<[u8]> {
        self.state.with(|s| s.shared(handle))
    }

    /// The handle's content as UTF-8, with invalid sequences replaced.
    pub fn text_lossy(&self, handle: StrHandle) -> String {
        String::from_utf8_lossy(&self.text_of(handle)).into_owned()
    }

    /// Byte length of the handle's content; 0 for unknown handles.
    pub fn length_of(&self, handle: StrHandle) -> usize {
        self.state.with(|s| s.length(handle))
    }

    /// Whether `handle` currently resolves in this pool. The empty handle
    /// always does.
    pub fn contains(&self, handle: StrHandle) -> bool {
        handle.is_empty_handle() || self.state.with(|s| s.decode(handle).is_some())
    }

    /// Take an extra reference. Returns false for unknown handles.
    pub fn retain(&self, handle: StrHandle) -> bool {
        self.state.with(|s| s.retain(handle))
    }

    /// Drop one reference, freeing the entry when none remain. Returns false
    /// for unknown handles. A no-op on pools without ref-counting.
    pub fn release(&self, handle: StrHandle) -> bool {
        self.state.with(|s| s.release(handle))
    }

    /// Number of distinct stored strings (the empty string is not stored).
    pub fn entry_count(&self) -> usize {
        self.state.with(|s| s.live)
    }

    pub fn scratch_capacity(&self) -> usize {
        self.state.with(|s| s.scratch.buf.capacity())
    }
}

impl PoolState {
    /// Stage a derived string in the scratch buffer and intern it.
    pub(crate) fn build(
        &mut self,
        required: usize,
        fill: impl FnOnce(&Self, &mut Vec<u8>),
    ) -> StrHandle {
        let mut buf = self.scratch.take(required);
        fill(self, &mut buf);
        let handle = self.intern(&buf);
        self.scratch.restore(buf);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted() -> StringPool {
        StringPool::with_config(PoolConfig {
            ref_counted: true,
            generation_bits: 4,
            ..PoolConfig::default()
        })
        .unwrap()
    }

    /// Invariant: identical content yields the identical handle.
    #[test]
    fn interning_is_content_deterministic() {
        let pool = StringPool::new();
        let a = pool.intern(b"hello");
        let b = pool.intern(&b"hello world"[..5]);
        assert_eq!(a, b);
        assert_eq!(pool.entry_count(), 1);
    }

    /// Invariant: distinct content yields distinct handles, even for a shared prefix.
    #[test]
    fn distinct_content_distinct_handles() {
        let pool = StringPool::new();
        let a = pool.intern(b"ab");
        let b = pool.intern(b"abc");
        let c = pool.intern(b"ab\0");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    /// Invariant: content round-trips exactly, including embedded zero bytes.
    #[test]
    fn text_round_trip_with_embedded_nul() {
        let pool = StringPool::new();
        let h = pool.intern(b"a\0b\0");
        assert_eq!(&*pool.text_of(h), b"a\0b\0");
        assert_eq!(pool.length_of(h), 4);
    }

    /// Invariant: the empty string is the reserved handle and is not stored.
    #[test]
    fn empty_string_is_reserved_handle() {
        let pool = StringPool::new();
        assert_eq!(pool.intern(b""), StrHandle::EMPTY);
        assert_eq!(pool.intern_str(""), StrHandle::EMPTY);
        assert_eq!(pool.entry_count(), 0);
        assert!(pool.text_of(StrHandle::EMPTY).is_empty());
        assert!(pool.contains(StrHandle::EMPTY));
    }

    /// Invariant: unknown handles read as empty with length 0.
    #[test]
    fn unknown_handle_degrades_to_empty() {
        let pool = StringPool::new();
        pool.intern(b"x");
        let bogus = StrHandle::from_raw(9_999);
        assert!(pool.text_of(bogus).is_empty());
        assert_eq!(pool.length_of(bogus), 0);
        assert_eq!(pool.text_lossy(bogus), "");
        assert!(!pool.contains(bogus));
        assert!(!pool.release(bogus));
        assert!(!pool.retain(bogus));
    }

    /// Invariant: without ref-counting, release never frees.
    #[test]
    fn release_is_noop_without_ref_counting() {
        let pool = StringPool::new();
        let h = pool.intern(b"keep");
        assert!(pool.release(h));
        assert!(pool.release(h));
        assert_eq!(&*pool.text_of(h), b"keep");
    }

    /// Invariant: a ref-counted entry lives while its count is positive.
    #[test]
    fn ref_counted_entry_freed_at_zero() {
        let pool = counted();
        let h1 = pool.intern(b"shared");
        let h2 = pool.intern(b"shared");
        assert_eq!(h1, h2);
        assert!(pool.release(h1));
        assert!(pool.contains(h2), "one reference remains");
        assert!(pool.release(h2));
        assert!(!pool.contains(h1));
        assert!(pool.text_of(h1).is_empty());
        assert_eq!(pool.entry_count(), 0);
    }

    /// Invariant: a recycled slot gets a new generation, so the stale handle
    /// does not alias the new entry.
    #[test]
    fn stale_handle_does_not_alias_recycled_slot() {
        let pool = counted();
        let old = pool.intern(b"old");
        pool.release(old);
        let new = pool.intern(b"new");
        assert_ne!(old, new);
        assert_eq!(old.to_raw() & 0x0FFF_FFFF, new.to_raw() & 0x0FFF_FFFF);
        assert!(pool.text_of(old).is_empty());
        assert_eq!(&*pool.text_of(new), b"new");
    }

    /// Invariant: views handed out earlier stay intact after the entry is freed.
    #[test]
    fn shared_view_outlives_release() {
        let pool = counted();
        let h = pool.intern(b"transient");
        let view = pool.text_of(h);
        pool.release(h);
        assert_eq!(&*view, b"transient");
    }

    /// Invariant: retain adds a reference that must be released separately.
    #[test]
    fn retain_extends_lifetime() {
        let pool = counted();
        let h = pool.intern(b"r");
        assert!(pool.retain(h));
        pool.release(h);
        assert!(pool.contains(h));
        pool.release(h);
        assert!(!pool.contains(h));
    }

    /// Invariant: invalid configurations are rejected up front.
    #[test]
    fn config_validation() {
        let bad = PoolConfig {
            ref_counted: true,
            generation_bits: 0,
            ..PoolConfig::default()
        };
        assert_eq!(
            StringPool::with_config(bad).unwrap_err(),
            ConfigError::GenerationBits { got: 0, max: 16 }
        );
        let bad = PoolConfig {
            scratch_capacity: 0,
            ..PoolConfig::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::ZeroScratch));
        assert!(PoolConfig::default().validate().is_ok());
    }

    /// Invariant: the scratch buffer grows by doubling and never shrinks.
    #[test]
    fn scratch_grows_monotonically() {
        let mut s = Scratch::with_capacity(4);
        let buf = s.take(3);
        assert!(buf.capacity() >= 4);
        s.restore(buf);
        let buf = s.take(9);
        assert!(buf.capacity() >= 16);
        let grown = buf.capacity();
        s.restore(buf);
        let buf = s.take(1);
        assert_eq!(buf.capacity(), grown);
        assert!(buf.is_empty());
    }

    /// Invariant: the global pool is a single instance per process (per
    /// thread without `sync`).
    #[test]
    fn global_is_shared() {
        let a = StringPool::global();
        let b = StringPool::global();
        assert!(core::ptr::eq(a, b));
        let h = a.intern_str("global-pool-test");
        assert_eq!(b.text_lossy(h), "global-pool-test");
    }
}
