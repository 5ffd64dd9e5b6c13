use core::{
    ffi::c_void,
    ptr::{self, NonNull},
};

use lazy_static::lazy_static;
use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
use log::debug;

use crate::error::{InitError, InitResult};

lazy_static! {
    pub static ref PAGE_SIZE: usize = page_size();
}

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// Rounds `size` up to a whole number of pages.
pub fn round_to_page(size: usize) -> Option<usize> {
    let page = *PAGE_SIZE;
    size.checked_next_multiple_of(page)
}

/// Zero-filled, read-write anonymous mapping, unmapped on drop.
#[derive(Debug)]
pub struct MappedRegion {
    base: NonNull<u8>,
    len: usize,
}

impl MappedRegion {
    /// Maps at least `size` bytes, rounded up to the page size.
    pub fn reserve(size: usize) -> InitResult<MappedRegion> {
        if size == 0 {
            return Err(InitError::InvalidSize);
        }
        let len = round_to_page(size).ok_or(InitError::InvalidSize)?;

        let mem_ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if mem_ptr == MAP_FAILED {
            debug!("mmap of {len} bytes failed");
            return Err(InitError::MapFailed);
        }
        let base = NonNull::new(mem_ptr.cast::<u8>()).ok_or(InitError::MapFailed)?;

        debug!("mapped {len} bytes at {base:p} for a {size} byte request");
        Ok(MappedRegion { base, len })
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.base.as_ptr().cast::<c_void>(), self.len) };
    }
}
