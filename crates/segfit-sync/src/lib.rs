//! # Synchronization primitives
//!
//! Small, dependency-free lock types used to wrap a single allocator
//! instance behind a safe, shared interface. None of these primitives are
//! required by the allocator engine itself (it is single-threaded by
//! design, see the crate-level docs of `segfit`) — they exist purely for
//! the outer "default global instance" wrapper, so that a process with
//! more than one thread can still share one arena safely.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod mutex;
mod raw_spin;
mod spin_lock;
mod sync_once_cell;

pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    pub fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
}

pub trait RawUnlock {
    unsafe fn raw_unlock(&self);
}
