//! The allocator engine: `init`, `allocate`, `free`, `realloc`, arena
//! growth, and the optional consistency checker.

use crate::block::{BlockPtr, read_u32, tag_at, write_u32};
use crate::error::ArenaError;
use crate::host::Host;
use crate::seglist;
use crate::{DWORD, INIT_SIZE, MIN_BLOCK_SIZE, SEGLIST_COUNT, SENTINEL_REGION, SENTINEL_TRIPLE, WORD, align_up, class_of};
use log::{debug, error, trace};

/// A segregated-fit allocator over a caller-supplied [`Host`] arena.
///
/// `heap_base`/`heap_size` are not process globals: they live on this
/// value, so independent allocator instances over independent arenas are
/// directly supported. A process-wide "default instance" is the thin
/// wrapper's job (see `segfit-global`), not this type's.
pub struct Allocator<H: Host> {
    host: H,
    /// Byte offset of class `i`'s prolog triple. Fixed for the lifetime of
    /// the allocator once `init` returns.
    prolog: [u32; SEGLIST_COUNT],
    /// Byte offset of class `i`'s epilog triple. Relocated on every arena growth.
    epilog: [u32; SEGLIST_COUNT],
}

impl<H: Host> Allocator<H> {
    /// Take ownership of `host` without initializing the arena.
    ///
    /// Callers must call [`Allocator::init`] before any other operation.
    pub const fn new(host: H) -> Self {
        Self {
            host,
            prolog: [0; SEGLIST_COUNT],
            epilog: [0; SEGLIST_COUNT],
        }
    }

    /// Lay down the prolog/epilog sentinel regions and cross-link each
    /// class's (initially empty) free list.
    ///
    /// # Errors
    /// Returns [`ArenaError::Exhausted`] if the host cannot supply the
    /// initial `INIT_SIZE` bytes.
    pub fn init(&mut self) -> Result<(), ArenaError> {
        let base = self.host.extend(INIT_SIZE)?;
        for i in 0..SEGLIST_COUNT {
            self.prolog[i] = base + i as u32 * SENTINEL_TRIPLE;
            self.epilog[i] = base + SENTINEL_REGION + i as u32 * SENTINEL_TRIPLE;
        }
        let bytes = self.host.bytes_mut();
        for i in 0..SEGLIST_COUNT {
            let prolog = self.prolog[i];
            let epilog = self.epilog[i];
            write_u32(bytes, prolog, 0); // prolog.pred: unused sink
            write_u32(bytes, prolog + 4, epilog + 4); // prolog.succ -> epilog node (empty list)
            write_u32(bytes, prolog + 8, 0); // prolog.footer: terminates backward walks
            write_u32(bytes, epilog, 0); // epilog.header: terminates forward walks
            write_u32(bytes, epilog + 4, prolog); // epilog.pred -> prolog node (empty list)
            write_u32(bytes, epilog + 8, 0); // epilog.succ: unused sink
        }
        debug!("segfit: initialized arena at offset {base}, {INIT_SIZE} bytes of sentinels");
        Ok(())
    }

    /// The address of the epilog region's first word — also `NEXT(bp)` of
    /// the arena's last normal block.
    #[inline]
    fn epilog_region_start(&self) -> u32 {
        self.epilog[0]
    }

    /// Allocate a payload of at least `size` bytes, 8-byte aligned.
    ///
    /// Returns `Ok(None)` for a zero-size request (success, no allocation
    /// performed). Returns `Err` only if growing the arena was necessary
    /// and the host refused.
    ///
    /// # Errors
    /// Returns [`ArenaError::Exhausted`] if the arena had to grow and the
    /// host could not supply the requested bytes.
    pub fn allocate(&mut self, size: u32) -> Result<Option<BlockPtr>, ArenaError> {
        if size == 0 {
            return Ok(None);
        }
        let asize = align_up(size, DWORD) + DWORD;

        if let Some(bp) = self.find_fit(asize) {
            self.place(bp, asize);
            trace!("segfit: allocate({size}) -> {:#x} (fit, asize={asize})", bp.0);
            return Ok(Some(bp));
        }

        let bp = self.extend_for(asize)?;
        bp.set(self.host.bytes_mut(), asize, false);
        trace!("segfit: allocate({size}) -> {:#x} (grew arena, asize={asize})", bp.0);
        Ok(Some(bp))
    }

    /// Walk classes `class_of(asize)..SEGLIST_COUNT`, first-fit within each,
    /// escalating to the next class on a miss.
    fn find_fit(&self, asize: u32) -> Option<BlockPtr> {
        let bytes = self.host.bytes();
        for i in class_of(asize)..SEGLIST_COUNT {
            let mut cur = seglist::first(bytes, self.prolog[i]);
            while !seglist::is_sentinel(bytes, cur) {
                let bp = BlockPtr(cur);
                if bp.size(bytes) >= asize {
                    return Some(bp);
                }
                cur = bp.succ(bytes);
            }
        }
        None
    }

    /// Remove `bp` from its free list, then place it as an allocated block
    /// of size `asize`, splitting off and re-inserting a free remainder
    /// when the remainder would be at least `MIN_BLOCK_SIZE`.
    fn place(&mut self, bp: BlockPtr, asize: u32) {
        seglist::remove(self.host.bytes_mut(), bp);
        let bsize = bp.size(self.host.bytes());
        if bsize - asize >= MIN_BLOCK_SIZE {
            bp.set(self.host.bytes_mut(), asize, false);
            let remainder = bp.next(self.host.bytes());
            remainder.set(self.host.bytes_mut(), bsize - asize, true);
            self.insert_free(remainder);
        } else {
            bp.set(self.host.bytes_mut(), bsize, false);
        }
    }

    fn insert_free(&mut self, bp: BlockPtr) {
        let class = class_of(bp.size(self.host.bytes()));
        seglist::insert(self.host.bytes_mut(), self.prolog[class], bp);
    }

    /// No fit was found: either absorb-and-grow the free last block, or
    /// grow the arena fresh from the old epilog position. Returns the
    /// payload address the caller should place `asize` bytes at.
    fn extend_for(&mut self, asize: u32) -> Result<BlockPtr, ArenaError> {
        let epilog_start = self.epilog_region_start();
        let bytes = self.host.bytes();
        let last_ftr = epilog_start - WORD;
        let last_tag = tag_at(bytes, last_ftr);

        if last_tag.free() {
            let last_size = last_tag.size();
            let last_bp = BlockPtr(epilog_start - last_size + 4);
            self.grow_arena(asize - last_size)?;
            seglist::remove(self.host.bytes_mut(), last_bp);
            Ok(last_bp)
        } else {
            let bp = BlockPtr(epilog_start + 4);
            self.grow_arena(asize)?;
            Ok(bp)
        }
    }

    /// Free a previously allocated block, coalescing with free neighbors.
    ///
    /// A no-op if `bp` is `None` (mirrors freeing a null pointer).
    pub fn free(&mut self, bp: Option<BlockPtr>) {
        let Some(bp) = bp else { return };
        let bytes = self.host.bytes();
        let own_size = bp.size(bytes);
        let prev_bp = bp.prev(bytes);
        let prev_free = prev_bp.is_free(bytes);
        let next_bp = bp.next(bytes);
        let next_free = next_bp.is_free(bytes);

        let mut new_start = bp;
        let mut new_size = own_size;

        if prev_free {
            let prev_size = prev_bp.size(self.host.bytes());
            seglist::remove(self.host.bytes_mut(), prev_bp);
            new_start = prev_bp;
            new_size += prev_size;
        }
        if next_free {
            let next_size = next_bp.size(self.host.bytes());
            seglist::remove(self.host.bytes_mut(), next_bp);
            new_size += next_size;
        }

        new_start.set(self.host.bytes_mut(), new_size, true);
        self.insert_free(new_start);
        trace!("segfit: free({:#x}) -> coalesced block {:#x} size {new_size}", bp.0, new_start.0);
    }

    /// Resize a previously allocated block in place when possible, falling
    /// back to allocate+copy+free otherwise.
    ///
    /// `bp == None` behaves as `allocate(size)`. `size == 0` behaves as
    /// `free(bp)` and returns `None`.
    ///
    /// # Errors
    /// Returns [`ArenaError::Exhausted`] if growing the arena was
    /// necessary (either via the in-place "last block" path or the
    /// allocate-and-copy fallback) and the host refused.
    pub fn realloc(&mut self, bp: Option<BlockPtr>, size: u32) -> Result<Option<BlockPtr>, ArenaError> {
        let Some(bp) = bp else {
            return self.allocate(size);
        };
        if size == 0 {
            self.free(Some(bp));
            return Ok(None);
        }

        let asize = align_up(size, DWORD) + DWORD;
        let bytes = self.host.bytes();
        let cur = bp.size(bytes);
        let next_bp = bp.next(bytes);
        let next_free = next_bp.is_free(bytes);
        let next_size = next_bp.size(bytes);
        let is_last = next_bp.hdr() == self.epilog_region_start();

        let total = if next_free && cur + next_size >= asize {
            seglist::remove(self.host.bytes_mut(), next_bp);
            cur + next_size
        } else if !next_free && cur >= asize {
            cur
        } else if is_last {
            let absorbed = if next_free { cur + next_size } else { cur };
            // Only reachable when `bp` is the arena's last normal block;
            // absorbed <= asize always holds here by construction.
            debug_assert!(absorbed <= asize);
            self.grow_arena(asize - absorbed)?;
            if next_free {
                seglist::remove(self.host.bytes_mut(), next_bp);
            }
            asize
        } else {
            return self.realloc_fallback(bp, size, asize, cur);
        };

        if total - asize >= MIN_BLOCK_SIZE {
            bp.set(self.host.bytes_mut(), asize, false);
            let tail = bp.next(self.host.bytes());
            tail.set(self.host.bytes_mut(), total - asize, true);
            self.insert_free(tail);
        } else {
            bp.set(self.host.bytes_mut(), total, false);
        }
        trace!("segfit: realloc({:#x}, {size}) -> {:#x} (in place, total={total})", bp.0, bp.0);
        Ok(Some(bp))
    }

    /// Neither neighbor absorption nor in-place arena growth applies:
    /// allocate fresh, copy the payload, free the old block.
    fn realloc_fallback(
        &mut self,
        bp: BlockPtr,
        size: u32,
        asize: u32,
        cur: u32,
    ) -> Result<Option<BlockPtr>, ArenaError> {
        let new_bp = match self.allocate(size)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let copy_len = core::cmp::min(cur, asize) - DWORD;
        self.host
            .bytes_mut()
            .copy_within(bp.0 as usize..(bp.0 + copy_len) as usize, new_bp.0 as usize);
        self.free(Some(bp));
        trace!("segfit: realloc({:#x}, {size}) -> {:#x} (copied)", bp.0, new_bp.0);
        Ok(Some(new_bp))
    }

    /// Extend the arena by `delta` bytes (rounded up to 8) and relocate the
    /// epilog sentinel region to the new end of arena.
    ///
    /// # Errors
    /// Returns [`ArenaError::Exhausted`] if the host refuses to grow.
    fn grow_arena(&mut self, delta: u32) -> Result<(), ArenaError> {
        let delta = align_up(delta, DWORD);
        let old_epilog_start = self.epilog[0];

        let new_region_start = self.host.extend(delta)?;
        let new_epilog_start = new_region_start + delta - SENTINEL_REGION;

        self.host
            .bytes_mut()
            .copy_within(old_epilog_start as usize..(old_epilog_start + SENTINEL_REGION) as usize, new_epilog_start as usize);

        for i in 0..SEGLIST_COUNT {
            self.epilog[i] = new_epilog_start + i as u32 * SENTINEL_TRIPLE;
        }

        let bytes = self.host.bytes_mut();
        for i in 0..SEGLIST_COUNT {
            let epilog_node = self.epilog[i] + 4;
            let tail = read_u32(bytes, epilog_node); // epilog.pred, unaffected by the move
            if tail == self.prolog[i] {
                write_u32(bytes, self.prolog[i] + 4, epilog_node);
            } else {
                write_u32(bytes, tail + 4, epilog_node);
            }
        }

        debug!("segfit: grew arena by {delta} bytes, epilog relocated to {new_epilog_start:#x}");
        Ok(())
    }

    /// Walk every normal block and every free list, verifying the data
    /// model's invariants. Logs each violation found.
    #[must_use]
    pub fn check(&self) -> bool {
        let bytes = self.host.bytes();
        let mut ok = true;

        let mut addr = self.prolog[0] + SENTINEL_REGION + 4;
        let end = self.epilog_region_start();
        let mut prev_was_free = false;
        while BlockPtr(addr).hdr() < end {
            let bp = BlockPtr(addr);
            let hdr = bp.tag(bytes);
            let ftr = tag_at(bytes, bp.ftr(bytes));
            if hdr.into_bits() != ftr.into_bits() {
                error!("segfit: check: header/footer mismatch at {:#x}", bp.0);
                ok = false;
            }
            if hdr.free() && prev_was_free {
                error!("segfit: check: adjacent free blocks at {:#x}", bp.0);
                ok = false;
            }
            prev_was_free = hdr.free();
            addr = bp.next(bytes).0;
        }

        for i in 0..SEGLIST_COUNT {
            let mut cur = seglist::first(bytes, self.prolog[i]);
            while !seglist::is_sentinel(bytes, cur) {
                let bp = BlockPtr(cur);
                if !bp.is_free(bytes) {
                    error!("segfit: check: allocated block {:#x} found in free list {i}", bp.0);
                    ok = false;
                }
                let class = class_of(bp.size(bytes));
                if class != i {
                    error!("segfit: check: block {:#x} of size {} in wrong list {i} (expected {class})", bp.0, bp.size(bytes));
                    ok = false;
                }
                cur = bp.succ(bytes);
            }
        }

        ok
    }

    /// Current arena bounds, as reported by the host. Diagnostic only.
    #[must_use]
    pub fn arena_bounds(&self) -> (u32, u32) {
        self.host.arena_bounds()
    }

    /// The payload size of a previously allocated block, overhead excluded.
    #[must_use]
    pub fn payload_size(&self, bp: BlockPtr) -> u32 {
        bp.size(self.host.bytes()) - DWORD
    }

    /// Borrow the underlying host, e.g. to read payload bytes for testing.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }
}
