//! The global interpreter lock.
//!
//! Native-to-dynamic calls (trampolines, slot invocations) take the lock;
//! the thread already holding it may take it again. Functions marked
//! allow-thread release it around the native call and reacquire it before
//! converting the result.

use std::ops::Deref;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Reentrant lock guarding a value shared with the dynamic runtime.
#[derive(Debug, Default)]
pub struct GlobalLock<T> {
    inner: ReentrantMutex<T>,
}

impl<T> GlobalLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(value),
        }
    }

    /// Block until the current thread holds the lock.
    pub fn acquire(&self) -> GlobalLockGuard<'_, T> {
        GlobalLockGuard {
            guard: self.inner.lock(),
        }
    }

    /// Take the lock only if no other thread holds it.
    pub fn try_acquire(&self) -> Option<GlobalLockGuard<'_, T>> {
        self.inner.try_lock().map(|guard| GlobalLockGuard { guard })
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.inner.is_owned_by_current_thread()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// Proof that the current thread holds the lock.
pub struct GlobalLockGuard<'a, T> {
    guard: ReentrantMutexGuard<'a, T>,
}

impl<T> GlobalLockGuard<'_, T> {
    /// Run `f` with the lock released, then take it back.
    ///
    /// Only this guard's hold is released; nested guards on the same thread
    /// still hold the lock.
    pub fn allow_threads<R>(&mut self, f: impl FnOnce() -> R) -> R {
        ReentrantMutexGuard::unlocked(&mut self.guard, f)
    }
}

impl<T> Deref for GlobalLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}
