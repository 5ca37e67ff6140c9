//! # segfit — a segregated-fit dynamic storage allocator
//!
//! This crate implements the heap-management engine of a user-space dynamic
//! storage allocator over a single, contiguous, byte-addressable arena that
//! grows monotonically via a `sbrk`-style request to a host memory model.
//! It provides the classical triad of operations — allocate, free, resize —
//! with 8-byte aligned payload addresses.
//!
//! ## Architecture
//!
//! Three cooperating layers, leaves first:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                engine::Allocator<H>                 │
//! │    • init / allocate / free / realloc               │
//! │    • arena growth + epilog relocation                │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                   seglist                            │
//! │    • 13 segregated free lists, LIFO intra-class      │
//! │    • prolog/epilog sentinel triples per class         │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                    block                             │
//! │    • boundary-tagged header/footer words             │
//! │    • HDR/FTR/NEXT/PREV derivation                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The arena itself is owned by a caller-supplied [`host::Host`]
//! implementation; the engine never allocates memory of its own and never
//! dereferences payload bytes it hands out.
//!
//! ## Non-goals
//!
//! Thread safety, cross-arena allocation, returning memory to the host, and
//! hardening against caller misuse (double-free, wild pointers) are all out
//! of scope for this crate — see `segfit-sync`/`segfit-global` for the
//! thin wrapper that adds single-instance sharing across threads.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod block;
pub mod engine;
pub mod error;
pub mod host;
pub mod seglist;

pub use block::BlockPtr;
pub use engine::Allocator;
pub use error::ArenaError;
pub use host::Host;

#[cfg(any(test, feature = "std-host"))]
pub use host::VecHost;

/// Word size of the block-header/footer encoding, in bytes.
pub const WORD: u32 = 4;

/// Double-word size; the payload alignment granularity, in bytes.
pub const DWORD: u32 = 8;

/// Required payload alignment, in bytes.
pub const ALIGNMENT: u32 = 8;

/// Number of segregated size classes.
pub const SEGLIST_COUNT: usize = 13;

/// Smallest possible block size: header + pred + succ + footer.
pub const MIN_BLOCK_SIZE: u32 = 16;

/// Size of a single prolog or epilog sentinel triple, in bytes.
pub const SENTINEL_TRIPLE: u32 = 3 * WORD;

/// Size of the full prolog (or epilog) region: one triple per size class.
pub const SENTINEL_REGION: u32 = SEGLIST_COUNT as u32 * SENTINEL_TRIPLE;

/// Bytes requested from the host at `init`: prolog region plus epilog region.
pub const INIT_SIZE: u32 = 2 * SENTINEL_REGION;

/// Round `n` up to the nearest multiple of `align` (`align` must be a power of two).
#[inline]
#[must_use]
pub const fn align_up(n: u32, align: u32) -> u32 {
    (n + (align - 1)) & !(align - 1)
}

/// Size class for a block of `size` bytes: `clamp(floor(log2(size)) - 4, 0, 12)`.
///
/// Implemented with [`u32::ilog2`], the standard library's O(1) bit-scan
/// primitive — equivalent to a de Bruijn or bit-scan idiom, and just as
/// constant-time.
#[inline]
#[must_use]
pub fn class_of(size: u32) -> usize {
    let log2 = size.max(1).ilog2() as i32;
    (log2 - 4).clamp(0, (SEGLIST_COUNT - 1) as i32) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiples_of_eight() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
    }

    #[test]
    fn class_of_matches_the_spec_table() {
        assert_eq!(class_of(16), 0);
        assert_eq!(class_of(31), 0);
        assert_eq!(class_of(32), 1);
        assert_eq!(class_of(63), 1);
        assert_eq!(class_of(64), 2);
        assert_eq!(class_of(1 << 16), 12);
        assert_eq!(class_of(1 << 20), 12);
    }
}
