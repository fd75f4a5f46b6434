//! Coarse exclusive-access guard shared by the pool and the typed maps.
//!
//! The mode is chosen once at build time by the `sync` feature:
//! - `sync`: a `parking_lot::Mutex`; the containers are `Send + Sync`.
//! - no `sync`: an `UnsafeCell` whose debug builds count open scopes and
//!   panic on nested entry; the containers are `!Send + !Sync`.
//!
//! Access is closure-scoped. The lock (or the debug entry mark) is released
//! on every exit path, including panics. Closures passed to `with` are
//! crate-internal and must never call back into the same container; no user
//! code runs inside them.

#[cfg(feature = "sync")]
mod imp {
    use parking_lot::Mutex;

    pub(crate) struct Lock<T> {
        inner: Mutex<T>,
    }

    impl<T> Lock<T> {
        pub(crate) fn new(value: T) -> Self {
            Self {
                inner: Mutex::new(value),
            }
        }

        #[inline]
        pub(crate) fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
            let mut guard = self.inner.lock();
            f(&mut *guard)
        }

        pub(crate) fn get_mut(&mut self) -> &mut T {
            self.inner.get_mut()
        }
    }
}

#[cfg(not(feature = "sync"))]
mod imp {
    use core::cell::UnsafeCell;
    #[cfg(debug_assertions)]
    use core::cell::Cell;
    use core::marker::PhantomData;

    pub(crate) struct Lock<T> {
        cell: UnsafeCell<T>,
        // Open `with` scopes; only tracked in debug builds.
        #[cfg(debug_assertions)]
        depth: Cell<u32>,
        _nosend: PhantomData<*mut ()>,
    }

    /// Closes a `with` scope on drop, unwinding included.
    #[cfg(debug_assertions)]
    struct Scope<'a>(&'a Cell<u32>);

    #[cfg(debug_assertions)]
    impl Drop for Scope<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    impl<T> Lock<T> {
        pub(crate) fn new(value: T) -> Self {
            Self {
                cell: UnsafeCell::new(value),
                #[cfg(debug_assertions)]
                depth: Cell::new(0),
                _nosend: PhantomData,
            }
        }

        #[cfg(debug_assertions)]
        fn open_scope(&self) -> Scope<'_> {
            assert!(
                self.depth.get() == 0,
                "reentrant access to a handle-pool container"
            );
            self.depth.set(1);
            Scope(&self.depth)
        }

        #[inline]
        pub(crate) fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
            #[cfg(debug_assertions)]
            let _scope = self.open_scope();
            // SAFETY: `Lock` is !Sync (UnsafeCell) and !Send (PhantomData of
            // a raw pointer), so only this thread can get here. The closures
            // passed in by the crate never re-enter the same `Lock`, so this
            // is the only live reference for the duration of `f`.
            f(unsafe { &mut *self.cell.get() })
        }

        pub(crate) fn get_mut(&mut self) -> &mut T {
            self.cell.get_mut()
        }
    }
}

pub(crate) use imp::Lock;
