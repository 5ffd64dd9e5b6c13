//! Read-only views of the block chain: the block table printed while
//! debugging, and a structural check of the arena invariants.

use core::fmt;

use log::debug;

use crate::{
    arena::Arena,
    error::{CheckError, CheckResult},
    tag::{ALIGN, MIN_BLOCK, Tag, WORD, status},
};

/// One row of the block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// 1-based position in the chain.
    pub index: usize,
    pub allocated: bool,
    pub prev_allocated: bool,
    /// Address of the header.
    pub begin: usize,
    /// Address of the last byte.
    pub end: usize,
    pub size: usize,
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{:#010x}\t{:#010x}\t{}",
            self.index,
            status(self.allocated),
            status(self.prev_allocated),
            self.begin,
            self.end,
            self.size
        )
    }
}

/// Byte totals over the whole chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub used: usize,
    pub free: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.used + self.free
    }
}

/// Block table of an arena, printable with `{}`.
#[derive(Debug, Clone, Copy)]
pub struct Dump<'a> {
    arena: &'a Arena,
}

impl<'a> Dump<'a> {
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + 'a {
        let start = self.arena.start().addr();
        self.arena
            .blocks()
            .enumerate()
            .map(move |(i, block)| BlockInfo {
                index: i + 1,
                allocated: block.header.allocated,
                prev_allocated: block.header.prev_allocated,
                begin: start + block.offset,
                end: start + block.offset + block.size() - 1,
                size: block.size(),
            })
    }

    pub fn summary(&self) -> Summary {
        self.blocks().fold(Summary::default(), |mut sum, info| {
            if info.allocated {
                sum.used += info.size;
            } else {
                sum.free += info.size;
            }
            sum
        })
    }
}

const RULE: &str = "-------------------------------------------------------------------------";

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "No.\tStatus\tPrev\tt_Begin\t\tt_End\t\tt_Size")?;
        writeln!(f, "{RULE}")?;
        for info in self.blocks() {
            writeln!(f, "{info}")?;
        }
        writeln!(f, "{RULE}")?;

        let summary = self.summary();
        writeln!(f, "Total used size = {}", summary.used)?;
        writeln!(f, "Total free size = {}", summary.free)?;
        write!(f, "Total size = {}", summary.total())
    }
}

/// Writes the block table to the `debug` log, one row per record.
pub fn log_dump(arena: &Arena) {
    let dump = arena.dump();
    for info in dump.blocks() {
        debug!("{info}");
    }
    let summary = dump.summary();
    debug!(
        "used {} + free {} = {} bytes",
        summary.used,
        summary.free,
        summary.total()
    );
}

impl Arena {
    pub fn dump(&self) -> Dump<'_> {
        Dump { arena: self }
    }

    pub fn summary(&self) -> Summary {
        self.dump().summary()
    }

    /// Walks the whole chain and verifies that blocks tile the span exactly,
    /// status bits and footers agree with the neighbours, no two free blocks
    /// touch, and the cursor names a block.
    pub fn check(&self) -> CheckResult<()> {
        let mut offset = 0;
        let mut prev_allocated = true;
        let mut cursor_seen = self.cursor.is_none();

        while offset < self.span() {
            let tag = self.read(offset);
            let Some(header) = tag.decode() else {
                return Err(CheckError::MissingEndMark { offset: self.span() });
            };
            let size = header.size;
            if size < MIN_BLOCK || size % ALIGN != 0 || offset + size > self.span() {
                return Err(CheckError::BadSize { offset, size });
            }
            if header.prev_allocated != prev_allocated {
                return Err(CheckError::StalePrevBit { offset });
            }
            if !header.allocated {
                if !prev_allocated {
                    return Err(CheckError::AdjacentFree { offset });
                }
                let footer = self.read(offset + size - WORD);
                if footer != Tag::footer(size) {
                    return Err(CheckError::FooterMismatch {
                        offset,
                        footer: footer.bits(),
                    });
                }
            }
            if self.cursor == Some(offset) {
                cursor_seen = true;
            }

            prev_allocated = header.allocated;
            offset += size;
        }

        if !self.read(self.span()).is_end_mark() {
            return Err(CheckError::MissingEndMark { offset: self.span() });
        }
        match self.cursor {
            Some(cursor) if !cursor_seen => Err(CheckError::CursorAdrift { cursor }),
            _ => Ok(()),
        }
    }
}
