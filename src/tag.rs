//! Boundary tags.
//!
//! Every block starts with a one-word header holding its size and two status
//! bits. Free blocks repeat their size, with no status bits, in a footer word
//! at their last four bytes:
//!
//! ```text
//!   allocated block                 free block
//!   ┌────────┬──────────────┐       ┌────────┬──────────────┬────────┐
//!   │ size|pa│   payload    │       │ size|p0│   (unused)   │  size  │
//!   └────────┴──────────────┘       └────────┴──────────────┴────────┘
//!
//!   bit 0 (a): this block is allocated
//!   bit 1 (p): the block right before this one is allocated
//! ```
//!
//! The end of the arena is marked by a lone header word equal to `1`.

use core::fmt;

/// Size of one header or footer word in bytes.
pub const WORD: usize = size_of::<u32>();

/// Block sizes (and payload addresses) are multiples of this.
pub const ALIGN: usize = 8;

/// Smallest block able to stand on its own: a header and a footer.
pub const MIN_BLOCK: usize = 2 * WORD;

/// Largest size a header can hold once the status bits are masked off.
pub const MAX_BLOCK: usize = (u32::MAX as usize) & !(ALIGN - 1);

const ALLOCATED: u32 = 0b01;
const PREV_ALLOCATED: u32 = 0b10;
const STATUS: u32 = ALLOCATED | PREV_ALLOCATED;

/// Header word that terminates the block chain.
pub const END_MARK: Tag = Tag(1);

/// A raw header or footer word, as stored in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Tag(u32);

impl Tag {
    pub const fn from_bits(bits: u32) -> Tag {
        Tag(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Footer word for a free block of `size` bytes.
    pub const fn footer(size: usize) -> Tag {
        Tag(size as u32)
    }

    pub const fn is_end_mark(self) -> bool {
        self.0 == END_MARK.0
    }

    /// Decodes a header word. Returns `None` for the end mark.
    pub const fn decode(self) -> Option<Header> {
        if self.is_end_mark() {
            return None;
        }
        Some(Header {
            size: (self.0 & !STATUS) as usize,
            allocated: self.0 & ALLOCATED != 0,
            prev_allocated: self.0 & PREV_ALLOCATED != 0,
        })
    }

    /// Same word with the predecessor bit replaced.
    pub const fn with_prev_allocated(self, prev_allocated: bool) -> Tag {
        if prev_allocated {
            Tag(self.0 | PREV_ALLOCATED)
        } else {
            Tag(self.0 & !PREV_ALLOCATED)
        }
    }
}

/// Decoded contents of a block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub size: usize,
    pub allocated: bool,
    pub prev_allocated: bool,
}

impl Header {
    pub const fn new(size: usize, allocated: bool, prev_allocated: bool) -> Header {
        Header {
            size,
            allocated,
            prev_allocated,
        }
    }

    /// Packs the header into `size | prev_allocated << 1 | allocated`.
    pub const fn encode(self) -> Tag {
        debug_assert!(self.size % ALIGN == 0 && self.size <= MAX_BLOCK);
        let mut bits = self.size as u32;
        if self.allocated {
            bits |= ALLOCATED;
        }
        if self.prev_allocated {
            bits |= PREV_ALLOCATED;
        }
        Tag(bits)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, {}, prev {}",
            self.size,
            status(self.allocated),
            status(self.prev_allocated)
        )
    }
}

pub(crate) const fn status(allocated: bool) -> &'static str {
    if allocated { "used" } else { "Free" }
}

/// Block size needed to serve a `payload` byte request: the payload plus its
/// header, rounded up to [`ALIGN`]. `None` for empty or overflowing requests.
pub const fn block_size(payload: usize) -> Option<usize> {
    if payload == 0 {
        return None;
    }
    match payload.checked_add(WORD + ALIGN - 1) {
        Some(padded) => Some(padded & !(ALIGN - 1)),
        None => None,
    }
}
