use log::{debug, trace};

use crate::{
    arena::{Arena, Block},
    error::{ReleaseError, ReleaseResult},
    tag::{ALIGN, Header, WORD},
};

impl Arena {
    /// Frees the block whose payload starts at `ptr` and merges it with any
    /// free neighbour.
    ///
    /// Null, misaligned, out of range and already free pointers are rejected
    /// before anything is written.
    ///
    /// # Safety
    /// A non-null, aligned, in-range `ptr` must be a payload address returned
    /// by [`allocate`](Arena::allocate) on this arena. Any other address inside
    /// the arena is read as if a header preceded it.
    pub unsafe fn release(&mut self, ptr: *mut u8) -> ReleaseResult<()> {
        let block = match self.validate(ptr) {
            Ok(block) => block,
            Err(err) => {
                debug!("rejected release of {ptr:p}: {err}");
                return Err(err);
            }
        };

        let next = block.next();
        self.write_free(block.offset, block.size(), block.header.prev_allocated);
        self.set_prev_allocated(next, false);

        let mut merged = Block {
            offset: block.offset,
            header: Header::new(block.size(), false, block.header.prev_allocated),
        };
        if !block.header.prev_allocated {
            merged = self.merge_left(merged);
        }
        if let Some(right) = self.block(next) {
            if !right.is_allocated() {
                merged = self.merge_right(merged, right);
            }
        }

        trace!(
            "released block at +{}, free block at +{} now {} bytes",
            block.offset,
            merged.offset,
            merged.size()
        );
        Ok(())
    }

    fn validate(&self, ptr: *mut u8) -> ReleaseResult<Block> {
        if ptr.is_null() {
            return Err(ReleaseError::Null);
        }
        let addr = ptr.addr();
        if addr % ALIGN != 0 {
            return Err(ReleaseError::Misaligned);
        }
        if !self.contains(addr) {
            return Err(ReleaseError::OutOfRange);
        }

        // The end mark is never handed out, so it cannot name a live block.
        let block = self
            .block(self.offset_of(addr))
            .ok_or(ReleaseError::OutOfRange)?;
        if !block.is_allocated() {
            return Err(ReleaseError::DoubleFree);
        }
        Ok(block)
    }

    /// Absorbs `block` into the free block on its left, found via its footer.
    fn merge_left(&mut self, block: Block) -> Block {
        let left_size = self.read(block.offset - WORD).bits() as usize;
        let left = block.offset - left_size;
        let prev_allocated = self
            .block(left)
            .is_none_or(|left| left.header.prev_allocated);

        let size = left_size + block.size();
        self.write_free(left, size, prev_allocated);
        if self.cursor == Some(block.offset) {
            self.cursor = Some(left);
        }
        trace!("merged +{} into free block at +{left}", block.offset);

        Block {
            offset: left,
            header: Header::new(size, false, prev_allocated),
        }
    }

    /// Absorbs the free block `right` into `block`.
    fn merge_right(&mut self, block: Block, right: Block) -> Block {
        let size = block.size() + right.size();
        self.write_free(block.offset, size, block.header.prev_allocated);
        if self.cursor == Some(right.offset) {
            self.cursor = Some(block.offset);
        }
        trace!("merged +{} into free block at +{}", right.offset, block.offset);

        Block {
            offset: block.offset,
            header: Header::new(size, false, block.header.prev_allocated),
        }
    }
}
