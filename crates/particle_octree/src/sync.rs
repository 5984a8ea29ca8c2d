//! Lock primitives: the per-leaf spin lock and poison-free `RwLock` access.
//!
//! Leaf lock holders never block on anything except the particle store's
//! shared lock, so waits are short and bounded. Not re-entrant and never
//! poisoned.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared access. Lock poisoning is ignored.
#[inline]
pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access, ignoring poison like [`read`].
#[inline]
pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
  lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Test-and-test-and-set spin mutex.
pub struct SpinLock<T> {
  locked: AtomicBool,
  value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
  pub const fn new(value: T) -> Self {
    Self {
      locked: AtomicBool::new(false),
      value: UnsafeCell::new(value),
    }
  }

  /// Spin until the lock is acquired.
  #[inline]
  pub fn lock(&self) -> SpinLockGuard<'_, T> {
    loop {
      if self
        .locked
        .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
      {
        return SpinLockGuard {
          lock: self,
          _marker: PhantomData,
        };
      }
      while self.locked.load(Ordering::Relaxed) {
        std::hint::spin_loop();
      }
    }
  }

  /// Acquire without spinning.
  #[inline]
  pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
    self
      .locked
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
      .ok()
      .map(|_| SpinLockGuard {
        lock: self,
        _marker: PhantomData,
      })
  }

  /// Exclusive access through `&mut self`; no atomics involved.
  #[inline]
  pub fn get_mut(&mut self) -> &mut T {
    self.value.get_mut()
  }

  pub fn into_inner(self) -> T {
    self.value.into_inner()
  }
}

impl<T: Default> Default for SpinLock<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}

/// RAII guard, releases on drop.
pub struct SpinLockGuard<'a, T> {
  lock: &'a SpinLock<T>,
  _marker: PhantomData<&'a mut T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
  type Target = T;

  fn deref(&self) -> &T {
    // SAFETY: the guard proves the lock is held.
    unsafe { &*self.lock.value.get() }
  }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
  fn deref_mut(&mut self) -> &mut T {
    // SAFETY: the guard proves the lock is held exclusively.
    unsafe { &mut *self.lock.value.get() }
  }
}

impl<T> Drop for SpinLockGuard<'_, T> {
  fn drop(&mut self) {
    self.lock.locked.store(false, Ordering::Release);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lock_and_release() {
    let lock = SpinLock::new(vec![1u32]);
    {
      let mut guard = lock.lock();
      guard.push(2);
      assert!(lock.try_lock().is_none(), "Held lock must not be re-acquired");
    }
    assert_eq!(*lock.lock(), vec![1, 2]);
  }

  #[test]
  fn test_contended_counter() {
    let lock = SpinLock::new(0u64);
    std::thread::scope(|s| {
      for _ in 0..8 {
        s.spawn(|| {
          for _ in 0..10_000 {
            *lock.lock() += 1;
          }
        });
      }
    });
    assert_eq!(lock.into_inner(), 80_000);
  }
}
