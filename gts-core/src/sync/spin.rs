/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Unfair spin lock primitives: `SpinMutex` (exclusive) and `RwSpinLock`
//! (shared/exclusive). Both use a test-and-set flag plus [`Backoff`], never
//! a queue — "unfair" here means a thread that just released the lock may
//! immediately reacquire it ahead of a longer-waiting thread, which is the
//! right trade for the short critical sections this crate protects (page
//! free-list splicing, slab list mutation).

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicIsize, AtomicBool, Ordering};

use super::backoff::Backoff;

/// A mutual-exclusion lock with no fairness guarantee and no OS-level
/// blocking on the fast path.
pub struct SpinMutex<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for SpinMutex<T> {}
unsafe impl<T: Send> Sync for SpinMutex<T> {}

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self { locked: AtomicBool::new(false), data: UnsafeCell::new(value) }
    }

    pub fn lock(&self) -> SpinMutexGuard<'_, T> {
        let mut backoff = Backoff::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.spin();
        }
        SpinMutexGuard { lock: self }
    }

    pub fn try_lock(&self) -> Option<SpinMutexGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinMutexGuard { lock: self })
    }
}

pub struct SpinMutexGuard<'a, T> {
    lock: &'a SpinMutex<T>,
}

impl<T> Deref for SpinMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// A shared/exclusive spin lock. Readers increment a counter; a writer sets
/// the counter to `-1` via CAS from `0`, so readers and the writer can never
/// overlap.
pub struct RwSpinLock<T> {
    state: AtomicIsize,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for RwSpinLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwSpinLock<T> {}

const WRITER: isize = -1;

impl<T> RwSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self { state: AtomicIsize::new(0), data: UnsafeCell::new(value) }
    }

    pub fn read(&self) -> RwSpinReadGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            let cur = self.state.load(Ordering::Relaxed);
            if cur != WRITER
                && self
                    .state
                    .compare_exchange_weak(cur, cur + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return RwSpinReadGuard { lock: self };
            }
            backoff.spin();
        }
    }

    pub fn write(&self) -> RwSpinWriteGuard<'_, T> {
        let mut backoff = Backoff::new();
        while self
            .state
            .compare_exchange_weak(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.spin();
        }
        RwSpinWriteGuard { lock: self }
    }
}

pub struct RwSpinReadGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwSpinReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

pub struct RwSpinWriteGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RwSpinWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwSpinWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn mutex_mutual_exclusion() {
        let m = Arc::new(SpinMutex::new(0u64));
        let mut handles = vec![];
        for _ in 0..8 {
            let m = m.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *m.lock() += 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*m.lock(), 8000);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let m = SpinMutex::new(0);
        let guard = m.lock();
        assert!(m.try_lock().is_none());
        drop(guard);
        assert!(m.try_lock().is_some());
    }

    #[test]
    fn rw_allows_concurrent_reads() {
        let l = Arc::new(RwSpinLock::new(5));
        let r1 = l.read();
        let r2 = l.read();
        assert_eq!(*r1, 5);
        assert_eq!(*r2, 5);
        drop((r1, r2));
        *l.write() = 9;
        assert_eq!(*l.read(), 9);
    }
}
