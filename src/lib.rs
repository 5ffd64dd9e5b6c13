//! # nextfit
//!
//! A heap allocator over one fixed region, mapped once from the operating
//! system. Blocks are found with a next-fit search, oversized blocks are
//! split, and freed blocks are merged with their free neighbours right away.
//! All bookkeeping lives inside the region as boundary tags: a header word at
//! the start of every block and a footer word at the end of every free one.
//!
//! ```text
//!   ┌───┬──────────┬───────────────────┬──────────┬──────────────┬───┐
//!   │pad│ A (used) │      B (free)     │ C (used) │   D (free)   │end│
//!   └───┴──────────┴───────────────────┴──────────┴──────────────┴───┘
//!                                      ▲
//!                                   cursor: the next search starts here,
//!                                   runs to the end mark and wraps once
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use nextfit::Heap;
//!
//! let mut heap = Heap::new();
//! heap.init(4096).unwrap();
//!
//! let ptr = heap.allocate(100).unwrap();
//! assert_eq!(ptr.as_ptr() as usize % 8, 0);
//!
//! unsafe {
//!     ptr.as_ptr().write_bytes(0, 100);
//!     heap.release(ptr.as_ptr()).unwrap();
//! }
//! ```
//!
//! An [`Arena`] can also be laid over memory the caller already owns with
//! [`Arena::from_raw_parts`].
//!
//! ## Limitations
//!
//! - Single-threaded only: no internal locking, and `Arena` is not `Send`.
//! - The region never grows or shrinks after initialization.
//! - Sizes are stored in 32-bit words, capping a region near 4 GiB.

#![cfg_attr(not(test), no_std)]

mod arena;
mod coalesce;
pub mod config;
pub mod dump;
mod error;
mod heap;
mod next_fit;
pub mod region;
pub mod tag;

pub use arena::{Arena, Block, Blocks};
pub use config::Config;
pub use dump::{BlockInfo, Dump, Summary};
pub use error::{
    AllocError, AllocResult, CheckError, CheckResult, InitError, InitResult, ReleaseError,
    ReleaseResult,
};
pub use heap::Heap;
