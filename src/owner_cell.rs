//! `OwnerCell<T>`: state confined to one owner thread, shared by reference
//! with every other thread but only touchable on the owner.
//!
//! No lock and no atomics on the access path. Access from any other thread,
//! or re-entrant access on the owner, is a programming error and panics.

use core::cell::{Cell, UnsafeCell};
use core::ops::{Deref, DerefMut};

use crate::util::current_thread_id;

/// A value only the owner thread may read or mutate.
pub struct OwnerCell<T> {
    owner_id: usize,
    locked: Cell<bool>,
    inner: UnsafeCell<T>,
}

// SAFETY: every shared access path checks that the caller is the owner
// thread, so the Cell and UnsafeCell are only ever touched from that one
// thread. `T: Send` because the value drops wherever the last reference dies.
unsafe impl<T: Send> Sync for OwnerCell<T> {}

impl<T> OwnerCell<T> {
    /// Wrap `value`, confining it to the thread with id `owner_id`.
    pub const fn new(owner_id: usize, value: T) -> Self {
        Self {
            owner_id,
            locked: Cell::new(false),
            inner: UnsafeCell::new(value),
        }
    }

    /// Is the calling thread the one allowed to touch the value?
    #[inline]
    pub fn is_owner(&self) -> bool {
        current_thread_id() == self.owner_id
    }

    /// Borrow mutably; `None` off the owner thread or while already borrowed.
    #[inline]
    pub fn try_lock(&self) -> Option<OwnerGuard<'_, T>> {
        if !self.is_owner() || self.locked.get() {
            return None;
        }
        self.locked.set(true);
        Some(OwnerGuard {
            cell: self,
            _marker: core::marker::PhantomData,
        })
    }

    /// Borrow mutably, panicking off the owner thread or on re-entry.
    #[inline]
    pub fn lock(&self) -> OwnerGuard<'_, T> {
        assert!(self.is_owner(), "OwnerCell accessed off its owner thread");
        self.try_lock()
            .expect("OwnerCell::lock: already borrowed (non-reentrant)")
    }

    /// Apply `f` to the value on the owner thread.
    #[inline]
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Exclusive access without the thread check; `&mut self` proves it.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

/// Borrow of an `OwnerCell`; releases on drop. Never leaves the owner thread.
pub struct OwnerGuard<'a, T> {
    cell: &'a OwnerCell<T>,
    _marker: core::marker::PhantomData<*const ()>,
}

impl<T> Deref for OwnerGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the guard is the only live borrow, on the owner thread.
        unsafe { &*self.cell.inner.get() }
    }
}

impl<T> DerefMut for OwnerGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above.
        unsafe { &mut *self.cell.inner.get() }
    }
}

impl<T> Drop for OwnerGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        debug_assert!(self.cell.locked.get(), "OwnerGuard dropped when not locked");
        self.cell.locked.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn owner_can_mutate_and_relock() {
        let cell = OwnerCell::new(current_thread_id(), 1u32);
        cell.with_mut(|v| *v += 1);
        assert_eq!(*cell.lock(), 2);
    }

    #[test]
    fn reentrant_borrow_is_refused() {
        let cell = OwnerCell::new(current_thread_id(), ());
        let _g = cell.lock();
        assert!(cell.try_lock().is_none());
    }

    #[test]
    fn other_threads_are_refused() {
        let cell = Arc::new(OwnerCell::new(current_thread_id(), 0u8));
        let remote = cell.clone();
        let refused = std::thread::spawn(move || remote.try_lock().is_none())
            .join()
            .unwrap();
        assert!(refused);

        let remote = cell.clone();
        let panicked = std::thread::spawn(move || {
            remote.with_mut(|v| *v = 9);
        })
        .join()
        .is_err();
        assert!(panicked);
        assert_eq!(*cell.lock(), 0);
    }
}
