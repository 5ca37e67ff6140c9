//! The host memory model the engine grows its arena against.
//!
//! This is a single `sbrk`-style growth primitive plus an optional bounds
//! query, generalized into a trait so the engine can be driven by an
//! in-memory `Vec<u8>` in tests as well as by any real embedder-supplied
//! backing store.

use crate::error::ArenaError;

/// A byte-addressable region the allocator engine grows monotonically.
///
/// Implementors own the actual storage; the engine only ever reads and
/// writes through [`Host::bytes`]/[`Host::bytes_mut`] and never retains a
/// pointer across an [`Host::extend`] call (the backing storage may move).
pub trait Host {
    /// Extend the arena by `n` bytes and return the offset of the first
    /// newly added byte.
    ///
    /// `n` is always a non-negative multiple of 8 when called by the
    /// engine. Returns [`ArenaError::Exhausted`] if the host cannot grow.
    fn extend(&mut self, n: u32) -> Result<u32, ArenaError>;

    /// The arena's current bounds as byte offsets `[lo, hi)`. Diagnostic only.
    fn arena_bounds(&self) -> (u32, u32) {
        (0, self.bytes().len() as u32)
    }

    /// A shared view over the whole arena.
    fn bytes(&self) -> &[u8];

    /// A mutable view over the whole arena.
    fn bytes_mut(&mut self) -> &mut [u8];
}

/// A [`Host`] backed by a growable [`alloc::vec::Vec`].
///
/// This is the crate's test double for the external `sbrk`-style
/// collaborator; it is also suitable for any caller who wants a
/// heap-backed arena without writing their own `Host`.
#[cfg(any(test, feature = "std-host"))]
pub struct VecHost {
    buf: alloc::vec::Vec<u8>,
    /// Optional cap on total arena size, for exercising exhaustion.
    limit: Option<u32>,
}

#[cfg(any(test, feature = "std-host"))]
impl VecHost {
    /// An unbounded `Vec`-backed host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: alloc::vec::Vec::new(),
            limit: None,
        }
    }

    /// A `Vec`-backed host that refuses to grow past `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Self {
            buf: alloc::vec::Vec::new(),
            limit: Some(limit),
        }
    }
}

#[cfg(any(test, feature = "std-host"))]
impl Default for VecHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std-host"))]
impl Host for VecHost {
    fn extend(&mut self, n: u32) -> Result<u32, ArenaError> {
        let old_len = self.buf.len() as u32;
        let new_len = old_len
            .checked_add(n)
            .ok_or(ArenaError::Exhausted { requested: n })?;
        if let Some(limit) = self.limit {
            if new_len > limit {
                return Err(ArenaError::Exhausted { requested: n });
            }
        }
        self.buf.resize(new_len as usize, 0);
        Ok(old_len)
    }

    fn bytes(&self) -> &[u8] {
        &self.buf
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}
