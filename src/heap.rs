use core::ptr::NonNull;

use log::debug;

use crate::{
    arena::Arena,
    config::Config,
    dump::{self, Dump},
    error::{InitError, InitResult, ReleaseError, ReleaseResult},
    region::{MappedRegion, round_to_page},
    tag::{ALIGN, MAX_BLOCK},
};

/// Owns one mapped region and the arena carved out of it.
///
/// A heap is initialized at most once; until then every allocation fails.
#[derive(Debug)]
pub struct Heap {
    // Declared before `region` so it never outlives the mapping.
    arena: Option<Arena>,
    region: Option<MappedRegion>,
    config: Config,
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

impl Heap {
    /// An uninitialized heap configured from the environment.
    pub fn new() -> Heap {
        Heap::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Heap {
        Heap {
            arena: None,
            region: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.arena.is_some()
    }

    /// Maps `region_size` bytes, rounded up to the page size, and turns them
    /// into one free block.
    pub fn init(&mut self, region_size: usize) -> InitResult<()> {
        if self.region.is_some() {
            debug!("heap already initialized");
            return Err(InitError::AlreadyInitialized);
        }
        if region_size == 0 {
            return Err(InitError::InvalidSize);
        }

        // Sizes live in 32-bit tags; refuse before mapping anything.
        let len = round_to_page(region_size).ok_or(InitError::InvalidSize)?;
        if len - ALIGN > MAX_BLOCK {
            debug!("region of {len} bytes is too large for a block header");
            return Err(InitError::InvalidSize);
        }

        let region = MappedRegion::reserve(region_size)?;
        // On error the region drops here and the heap stays initializable.
        let arena = unsafe { Arena::from_raw_parts(region.base(), region.len())? };
        self.region = Some(region);
        self.arena = Some(arena);
        Ok(())
    }

    /// [`init`](Heap::init) with the configured region size.
    pub fn init_default(&mut self) -> InitResult<()> {
        self.init(self.config.region_size)
    }

    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    /// See [`Arena::allocate`]. Always `None` before initialization.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let arena = self.arena.as_mut()?;
        let ptr = arena.allocate(size)?;
        if self.config.trace_dump {
            dump::log_dump(arena);
        }
        Some(ptr)
    }

    /// See [`Arena::release`]. Before initialization no pointer but null is
    /// in range.
    ///
    /// # Safety
    /// Same contract as [`Arena::release`].
    pub unsafe fn release(&mut self, ptr: *mut u8) -> ReleaseResult<()> {
        let Some(arena) = self.arena.as_mut() else {
            return Err(if ptr.is_null() {
                ReleaseError::Null
            } else {
                ReleaseError::OutOfRange
            });
        };
        unsafe { arena.release(ptr)? };
        if self.config.trace_dump {
            dump::log_dump(arena);
        }
        Ok(())
    }

    pub fn dump(&self) -> Option<Dump<'_>> {
        self.arena.as_ref().map(Arena::dump)
    }
}
