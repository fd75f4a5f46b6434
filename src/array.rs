//! DynArray: contiguous growable sequence of `Copy` items.
//!
//! Independent of the table and the pool. Index-based accessors report out
//! of range positions with `None`/`false` instead of panicking.

use core::cmp::Ordering;

const INITIAL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynArray<T> {
    items: Vec<T>,
}

impl<T: Copy> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> DynArray<T> {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    /// Remove in O(1) by moving the last item into the gap. Order is not kept.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.swap_remove(index))
    }

    /// Remove and shift the tail down, keeping order.
    pub fn remove_ordered(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    pub fn set(&mut self, index: usize, item: T) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Borrow an item in place; valid until the next mutation.
    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn sort_by(&mut self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.items.sort_by(compare);
    }

    /// Position of an item for which `compare` returns `Equal`, assuming the
    /// array is sorted consistently with it.
    pub fn binary_search_by(&self, compare: impl FnMut(&T) -> Ordering) -> Option<usize> {
        self.items.binary_search_by(compare).ok()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T: Copy> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: unordered removal fills the gap with the last item.
    #[test]
    fn remove_swaps_in_last() {
        let mut a = DynArray::new();
        for x in [10, 20, 30, 40] {
            a.add(x);
        }
        assert_eq!(a.remove(1), Some(20));
        assert_eq!(a.as_slice(), &[10, 40, 30]);
        assert_eq!(a.remove(7), None);
    }

    /// Invariant: ordered removal preserves relative order.
    #[test]
    fn remove_ordered_shifts() {
        let mut a = DynArray::new();
        for x in [1, 2, 3, 4] {
            a.add(x);
        }
        assert_eq!(a.remove_ordered(0), Some(1));
        assert_eq!(a.as_slice(), &[2, 3, 4]);
    }

    /// Invariant: get/set respect bounds.
    #[test]
    fn get_and_set_bounds() {
        let mut a: DynArray<u8> = DynArray::with_capacity(1);
        assert_eq!(a.get(0), None);
        assert!(!a.set(0, 1));
        a.add(5);
        assert!(a.set(0, 6));
        assert_eq!(a.get(0), Some(6));
        *a.item_mut(0).unwrap() += 1;
        assert_eq!(a.item(0), Some(&7));
    }

    /// Invariant: sort then binary search finds present items only.
    #[test]
    fn sort_and_search() {
        let mut a = DynArray::new();
        for x in [3, 1, 5, 2, 4] {
            a.add(x);
        }
        a.sort_by(|x, y| x.cmp(y));
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(a.binary_search_by(|x| x.cmp(&4)), Some(3));
        assert_eq!(a.binary_search_by(|x| x.cmp(&9)), None);
    }

    /// Invariant: growth past the initial capacity keeps every item.
    #[test]
    fn grows_past_initial_capacity() {
        let mut a = DynArray::with_capacity(2);
        for x in 0..1_000u32 {
            a.add(x);
        }
        assert_eq!(a.len(), 1_000);
        assert_eq!(a.get(999), Some(999));
        assert_eq!((&a).into_iter().count(), 1_000);
    }
}
