//! A [`segfit::Host`] implementation backed by a single statically reserved
//! byte array, for embedding `segfit` as a process's `#[global_allocator]`.
//!
//! A fixed-size `.bss` region stands in for the `sbrk`-style host the core
//! engine expects; `extend` simply hands out the next slice of that region
//! until it is exhausted.

use segfit::{ArenaError, Host};

/// Total size of the statically reserved arena backing the global allocator.
///
/// The arena never shrinks and `extend` fails once this is exhausted, same
/// as any other `sbrk`-backed host. Adjust to taste; this is not tied to
/// any invariant of the engine itself.
const HEAP_SIZE: usize = 64 * 1024 * 1024; // 64 MiB

/// Backing storage, placed in a dedicated `.bss` section so it does not
/// bloat the binary image.
#[repr(align(16))]
struct HeapMem([u8; HEAP_SIZE]);

#[unsafe(link_section = ".bss.heap")]
static mut HEAP: HeapMem = HeapMem([0; HEAP_SIZE]);

/// The address of the first byte of the static arena.
///
/// Stable for the lifetime of the process: `HEAP` is a single `static`, never
/// moved or reallocated.
#[inline]
fn heap_base() -> *mut u8 {
    // Safety: taking the address of a static does not create a reference to
    // its contents, so this is sound even while other code holds `&mut`
    // access to `HEAP` under the allocator's lock.
    unsafe { (&raw mut HEAP.0).cast::<u8>() }
}

/// Convert a previously-issued payload pointer back to its arena offset.
///
/// # Safety
/// `ptr` must point into the static arena (i.e. have been produced by
/// offsetting [`heap_base`]).
#[inline]
pub(crate) unsafe fn offset_of(ptr: *mut u8) -> u32 {
    (ptr as usize - heap_base() as usize) as u32
}

/// Convert an arena offset (as carried by [`segfit::BlockPtr`]) to a raw
/// pointer into the static arena.
#[inline]
pub(crate) fn ptr_at(offset: u32) -> *mut u8 {
    // Safety: offsets handed out by the engine are always within
    // `[0, HEAP_SIZE)` once the arena has grown to cover them.
    unsafe { heap_base().add(offset as usize) }
}

/// A [`Host`] over the static arena. There is exactly one useful instance of
/// this type per process; see [`crate::GlobalAllocator`] for the wrapper
/// that owns it.
pub struct StaticHost {
    /// Number of bytes of the static arena handed out so far.
    used: u32,
}

impl StaticHost {
    /// An empty host: no bytes of the static arena are in use yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { used: 0 }
    }
}

impl Default for StaticHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for StaticHost {
    fn extend(&mut self, n: u32) -> Result<u32, ArenaError> {
        let old = self.used;
        let new = old
            .checked_add(n)
            .filter(|&v| (v as usize) <= HEAP_SIZE)
            .ok_or(ArenaError::Exhausted { requested: n })?;
        self.used = new;
        Ok(old)
    }

    fn bytes(&self) -> &[u8] {
        // Safety: `self.used` never exceeds `HEAP_SIZE`, and the allocator
        // that owns this host serializes all access to it behind a lock.
        unsafe { core::slice::from_raw_parts(heap_base(), self.used as usize) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        // Safety: see `bytes`.
        unsafe { core::slice::from_raw_parts_mut(heap_base(), self.used as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_hands_out_disjoint_growing_ranges() {
        let mut host = StaticHost::new();
        let a = host.extend(64).unwrap();
        let b = host.extend(128).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 64);
        assert_eq!(host.bytes().len(), 192);
    }

    #[test]
    fn extend_past_the_static_capacity_fails() {
        let mut host = StaticHost::new();
        let err = host.extend(HEAP_SIZE as u32 + 8).unwrap_err();
        assert!(matches!(err, ArenaError::Exhausted { .. }));
    }
}
