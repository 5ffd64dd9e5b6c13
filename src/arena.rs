use core::ptr::NonNull;

use log::debug;

use crate::{
    error::{InitError, InitResult},
    tag::{ALIGN, END_MARK, Header, MAX_BLOCK, MIN_BLOCK, Tag, WORD},
};

/// A single contiguous region carved into boundary-tagged blocks.
///
/// Blocks are addressed by their byte offset from the first header. The
/// first header sits one word past the region base so that every payload
/// lands on an 8-byte boundary; the end mark sits at offset `span`.
///
/// ```text
///   base
///   │ pad │ hdr │ ... block 0 ... │ hdr │ ... block 1 ... │ end │
///         ▲                                               ▲
///       start (+0)                                   start + span
/// ```
#[derive(Debug)]
pub struct Arena {
    start: NonNull<u8>,
    span: usize,
    /// Offset of the block where the next search begins.
    pub(crate) cursor: Option<usize>,
}

/// A block found while walking the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub offset: usize,
    pub header: Header,
}

impl Block {
    pub fn size(&self) -> usize {
        self.header.size
    }

    pub fn is_allocated(&self) -> bool {
        self.header.allocated
    }

    /// Offset of the block right after this one.
    pub fn next(&self) -> usize {
        self.offset + self.header.size
    }
}

impl Arena {
    /// Turns `len` bytes at `base` into one free block followed by the end mark.
    ///
    /// One word of padding and the end mark are taken out of the region, so
    /// the usable span is `len - 8`, rounded down to a multiple of 8.
    ///
    /// # Safety
    /// `base..base + len` must be valid for reads and writes, and must not be
    /// touched by anything but the returned arena for as long as it is used.
    pub unsafe fn from_raw_parts(base: NonNull<u8>, len: usize) -> InitResult<Arena> {
        if len < 2 * ALIGN {
            return Err(InitError::InvalidSize);
        }
        if base.as_ptr().addr() % ALIGN != 0 {
            return Err(InitError::Misaligned);
        }
        let span = (len - ALIGN) & !(ALIGN - 1);
        if span > MAX_BLOCK {
            return Err(InitError::InvalidSize);
        }

        let mut arena = Arena {
            start: unsafe { base.add(WORD) },
            span,
            cursor: None,
        };
        // No real predecessor: mark it allocated so nothing coalesces leftwards.
        arena.write(0, Header::new(span, false, true).encode());
        arena.write(span - WORD, Tag::footer(span));
        arena.write(span, END_MARK);

        debug!(
            "arena initialized at {:p}: {} of {} bytes usable",
            arena.start, span, len
        );
        Ok(arena)
    }

    /// Address of the first block header.
    pub fn start(&self) -> *const u8 {
        self.start.as_ptr()
    }

    /// Bytes covered by blocks, excluding the padding word and the end mark.
    pub fn span(&self) -> usize {
        self.span
    }

    /// Offset of the block the next allocation search starts from.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            arena: self,
            offset: 0,
        }
    }

    /// Decodes the header at `offset`, `None` at the end mark.
    pub fn block(&self, offset: usize) -> Option<Block> {
        self.read(offset)
            .decode()
            .map(|header| Block { offset, header })
    }

    /// Payload address of the block at `offset`.
    pub fn payload(&self, offset: usize) -> NonNull<u8> {
        unsafe { self.start.add(offset + WORD) }
    }

    /// Offset of the block whose payload starts at `addr`.
    pub(crate) fn offset_of(&self, addr: usize) -> usize {
        addr - self.start.as_ptr().addr() - WORD
    }

    pub(crate) fn contains(&self, addr: usize) -> bool {
        let start = self.start.as_ptr().addr();
        addr >= start && addr < start + self.span
    }

    pub(crate) fn read(&self, offset: usize) -> Tag {
        debug_assert!(offset % WORD == 0 && offset <= self.span);
        unsafe { self.start.add(offset).cast::<Tag>().read() }
    }

    pub(crate) fn write(&mut self, offset: usize, tag: Tag) {
        debug_assert!(offset % WORD == 0 && offset <= self.span);
        unsafe { self.start.add(offset).cast::<Tag>().write(tag) }
    }

    /// Writes a free block: header plus matching footer.
    pub(crate) fn write_free(&mut self, offset: usize, size: usize, prev_allocated: bool) {
        debug_assert!(size >= MIN_BLOCK);
        self.write(offset, Header::new(size, false, prev_allocated).encode());
        self.write(offset + size - WORD, Tag::footer(size));
    }

    /// Updates the predecessor bit of the block at `offset`. The end mark is
    /// left untouched.
    pub(crate) fn set_prev_allocated(&mut self, offset: usize, prev_allocated: bool) {
        let tag = self.read(offset);
        if !tag.is_end_mark() {
            self.write(offset, tag.with_prev_allocated(prev_allocated));
        }
    }
}

/// Walks the chain from the first block up to the end mark.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    arena: &'a Arena,
    offset: usize,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.offset >= self.arena.span {
            return None;
        }
        let block = self.arena.block(self.offset)?;
        // A zero size would never advance; stop rather than spin.
        if block.size() == 0 {
            return None;
        }
        self.offset = block.next();
        Some(block)
    }
}
