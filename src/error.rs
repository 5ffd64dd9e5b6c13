use core::fmt;

pub type InitResult<T> = Result<T, InitError>;
pub type AllocResult<T> = Result<T, AllocError>;
pub type ReleaseResult<T> = Result<T, ReleaseError>;
pub type CheckResult<T> = Result<T, CheckError>;

/// Failure to set up an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Region size is zero, too small to hold a block, or too large for a header.
    InvalidSize,
    /// The heap handle already owns an arena.
    AlreadyInitialized,
    /// Region base is not aligned to 8 bytes.
    Misaligned,
    /// The operating system refused the mapping.
    MapFailed,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::InvalidSize => f.write_str("requested region size is not usable"),
            InitError::AlreadyInitialized => f.write_str("heap has already been initialized"),
            InitError::Misaligned => f.write_str("region base is not 8-byte aligned"),
            InitError::MapFailed => f.write_str("mmap could not reserve the region"),
        }
    }
}

impl core::error::Error for InitError {}

/// Reason an allocation request came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Zero bytes, or more than the arena could ever hold.
    InvalidSize,
    /// One full lap of the block chain found no free block large enough.
    NoFitFound,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::InvalidSize => f.write_str("request size is zero or exceeds the arena"),
            AllocError::NoFitFound => f.write_str("no free block is large enough"),
        }
    }
}

impl core::error::Error for AllocError {}

/// Rejected release. Nothing in the arena changes when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseError {
    Null,
    Misaligned,
    OutOfRange,
    DoubleFree,
}

impl fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseError::Null => f.write_str("null pointer"),
            ReleaseError::Misaligned => f.write_str("pointer is not 8-byte aligned"),
            ReleaseError::OutOfRange => f.write_str("pointer lies outside the arena"),
            ReleaseError::DoubleFree => f.write_str("block is already free"),
        }
    }
}

impl core::error::Error for ReleaseError {}

/// Broken arena invariant found by [`Arena::check`](crate::Arena::check).
/// Offsets are relative to the first block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckError {
    /// A header size is below the minimum, unaligned, or runs past the end mark.
    BadSize { offset: usize, size: usize },
    /// A header's predecessor bit disagrees with the block before it.
    StalePrevBit { offset: usize },
    /// A free block's footer does not repeat its size.
    FooterMismatch { offset: usize, footer: u32 },
    /// Two free blocks sit next to each other.
    AdjacentFree { offset: usize },
    /// The chain does not end in the end mark right at the span boundary.
    MissingEndMark { offset: usize },
    /// The next-fit cursor does not name the start of a block.
    CursorAdrift { cursor: usize },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CheckError::BadSize { offset, size } => {
                write!(f, "block at +{offset} has invalid size {size}")
            }
            CheckError::StalePrevBit { offset } => {
                write!(f, "block at +{offset} has a stale predecessor bit")
            }
            CheckError::FooterMismatch { offset, footer } => {
                write!(f, "free block at +{offset} has footer {footer}")
            }
            CheckError::AdjacentFree { offset } => {
                write!(f, "free block at +{offset} follows another free block")
            }
            CheckError::MissingEndMark { offset } => {
                write!(f, "no end mark at +{offset}")
            }
            CheckError::CursorAdrift { cursor } => {
                write!(f, "cursor +{cursor} is not a block start")
            }
        }
    }
}

impl core::error::Error for CheckError {}
