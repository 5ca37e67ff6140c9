//! Error taxonomy for the allocator engine.

/// Failure of the host's arena-growth primitive.
///
/// This is the only recoverable-from-the-engine's-perspective error in the
/// core: the host ran out of backing memory while the engine tried to
/// extend the arena by `requested` bytes. The engine restores its internal
/// state before returning this and never aborts on its own — that decision
/// belongs to the caller (see `segfit-global` for an embedder that maps
/// this to `GlobalAlloc`'s null-on-failure contract).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The host's `extend` refused to grow the arena by `requested` bytes.
    #[error("host refused to extend the arena by {requested} bytes")]
    Exhausted {
        /// The number of bytes the engine asked the host to add.
        requested: u32,
    },
}
