use core::ptr::NonNull;

use log::{debug, trace};

use crate::{
    arena::{Arena, Block},
    error::{AllocError, AllocResult},
    tag::{Header, MIN_BLOCK, block_size},
};

impl Arena {
    /// Allocates `size` payload bytes, returning an 8-byte aligned pointer or
    /// `None` on any failure. A failed call leaves the arena untouched.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.try_allocate(size).ok()
    }

    /// Like [`allocate`](Arena::allocate) but says why it failed.
    pub fn try_allocate(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        let total = match block_size(size) {
            Some(total) if total <= self.span() => total,
            _ => {
                debug!("rejected allocation of {size} bytes: arena span is {}", self.span());
                return Err(AllocError::InvalidSize);
            }
        };

        let Some(block) = self.find_fit(total) else {
            debug!("no free block holds {total} bytes");
            return Err(AllocError::NoFitFound);
        };
        self.place(block, total);
        self.cursor = Some(block.offset);

        Ok(self.payload(block.offset))
    }

    /// Next-fit search: one lap around the chain starting at the cursor,
    /// wrapping from the end mark back to the first block.
    fn find_fit(&self, total: usize) -> Option<Block> {
        let origin = self.cursor.unwrap_or(0);
        let mut offset = origin;

        loop {
            let block = self.block(offset)?;
            if !block.is_allocated() && block.size() >= total {
                return Some(block);
            }

            offset = block.next();
            if offset >= self.span() {
                offset = 0;
            }
            if offset == origin {
                return None;
            }
        }
    }

    /// Marks `block` allocated, splitting off the tail when it can stand as a
    /// free block of its own.
    fn place(&mut self, block: Block, total: usize) {
        let remainder = block.size() - total;

        if remainder >= MIN_BLOCK {
            self.write(
                block.offset,
                Header::new(total, true, block.header.prev_allocated).encode(),
            );
            self.write_free(block.offset + total, remainder, true);
            trace!(
                "split block at +{}: {total} allocated, {remainder} left free",
                block.offset
            );
        } else {
            let header = Header {
                allocated: true,
                ..block.header
            };
            self.write(block.offset, header.encode());
            self.set_prev_allocated(block.next(), true);
            trace!(
                "took whole block at +{} ({} bytes for {total})",
                block.offset,
                block.size()
            );
        }
    }
}
