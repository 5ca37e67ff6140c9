//! # segfit-global — a `#[global_allocator]` adapter for `segfit`
//!
//! `segfit` itself is deliberately single-threaded and holds no global
//! state (see its crate docs): `Allocator<H>` is a plain value a caller
//! threads through explicitly. This crate supplies a thin wrapper around
//! one default instance, behind a `SpinLock`-guarded static, the way a
//! single-threaded free-list allocator is usually made safe to install as
//! a process's `#[global_allocator]`.
//!
//! This crate does not install itself as the global allocator
//! automatically — a library forcing that choice on every downstream crate
//! that merely links against it would be a poor citizen. Instead it
//! exposes [`GlobalAllocator`], a `GlobalAlloc`-implementing type a binary
//! can opt into:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOCATOR: segfit_global::GlobalAllocator = segfit_global::GlobalAllocator::new();
//! ```
//!
//! ## Limitations
//!
//! The core engine only ever produces 8-byte aligned payloads. `alloc`/
//! `realloc` requests whose `Layout::align()` exceeds 8 are refused (a
//! logged `log::error!` and a null return), rather than silently
//! over-allocating to satisfy them — the engine has no facility for
//! alignment padding and this crate does not invent one.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod static_host;

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};
use log::error;
use segfit::{Allocator, BlockPtr};
use segfit_sync::SpinLock;
use static_host::StaticHost;

/// The maximum alignment the engine's fixed 8-byte payload alignment can
/// satisfy without cooperation from the caller.
const MAX_SUPPORTED_ALIGN: usize = 8;

static ALLOC: SpinLock<Allocator<StaticHost>> = SpinLock::new(Allocator::new(StaticHost::new()));
static DID_INIT: AtomicBool = AtomicBool::new(false);

/// Lay down the arena's sentinel regions on first use.
///
/// Uses a fast-path-outside/authoritative-check-inside-the-lock idiom: the
/// atomic load avoids taking the lock on the overwhelmingly common case
/// where initialization already happened.
fn ensure_init() {
    if DID_INIT.load(Ordering::Acquire) {
        return;
    }
    ALLOC.with_lock(|alloc| {
        if DID_INIT.load(Ordering::Relaxed) {
            return;
        }
        if alloc.init().is_err() {
            // The static arena is large but finite; failing to reserve the
            // ~150-byte sentinel region means it is essentially zero-sized.
            error!("segfit-global: failed to reserve the initial sentinel region");
            return;
        }
        DID_INIT.store(true, Ordering::Release);
    });
}

/// Convert a `Layout` into the `size` argument `segfit::Allocator::allocate`
/// expects, or `None` if `layout`'s alignment cannot be honored.
#[inline]
fn accepted_size(layout: Layout) -> Option<u32> {
    if layout.align() > MAX_SUPPORTED_ALIGN {
        return None;
    }
    u32::try_from(layout.size()).ok()
}

/// A `GlobalAlloc` implementation backed by one process-wide [`segfit`]
/// arena over a statically reserved byte array.
///
/// All operations are serialized by an internal spin lock (see
/// `segfit-sync`); `segfit`'s own engine remains single-threaded and knows
/// nothing about this wrapper.
pub struct GlobalAllocator;

impl GlobalAllocator {
    /// Construct the adapter. Does not touch the arena; the first
    /// `alloc`/`dealloc`/`realloc` call lazily initializes it.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for GlobalAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: `GlobalAlloc`'s contract applies. All access to the shared arena
// goes through `ALLOC`'s spin lock, so concurrent calls are serialized.
unsafe impl GlobalAlloc for GlobalAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ensure_init();
        let Some(size) = accepted_size(layout) else {
            error!(
                "segfit-global: alloc refused, align {} exceeds the supported maximum of {MAX_SUPPORTED_ALIGN}",
                layout.align()
            );
            return ptr::null_mut();
        };
        ALLOC.with_lock(|alloc| match alloc.allocate(size) {
            Ok(Some(bp)) => static_host::ptr_at(bp.0),
            Ok(None) => ptr::null_mut(),
            Err(err) => {
                error!("segfit-global: alloc({size}) failed: {err}");
                ptr::null_mut()
            }
        })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if ptr.is_null() {
            return;
        }
        // Safety: `ptr` was produced by a prior `alloc`/`realloc` call on
        // this same arena, per the `GlobalAlloc` contract.
        let offset = unsafe { static_host::offset_of(ptr) };
        ALLOC.with_lock(|alloc| alloc.free(Some(BlockPtr(offset))));
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // Safety: forwards to `alloc`, which upholds the same contract.
        let p = unsafe { self.alloc(layout) };
        if !p.is_null() {
            // Safety: `p` points at `layout.size()` freshly allocated bytes.
            unsafe { ptr::write_bytes(p, 0, layout.size()) };
        }
        p
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ensure_init();
        if layout.align() > MAX_SUPPORTED_ALIGN {
            error!(
                "segfit-global: realloc refused, align {} exceeds the supported maximum of {MAX_SUPPORTED_ALIGN}",
                layout.align()
            );
            return ptr::null_mut();
        }
        let Ok(new_size) = u32::try_from(new_size) else {
            return ptr::null_mut();
        };
        // Safety: `ptr` was produced by a prior `alloc`/`realloc` call on
        // this same arena, per the `GlobalAlloc` contract.
        let offset = unsafe { static_host::offset_of(ptr) };
        ALLOC.with_lock(|alloc| match alloc.realloc(Some(BlockPtr(offset)), new_size) {
            Ok(Some(bp)) => static_host::ptr_at(bp.0),
            Ok(None) => ptr::null_mut(),
            Err(err) => {
                error!("segfit-global: realloc(.., {new_size}) failed: {err}");
                ptr::null_mut()
            }
        })
    }
}
