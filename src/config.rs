use core::ffi::CStr;

/// Region size used when neither the caller nor the environment picks one.
pub const DEFAULT_REGION_SIZE: usize = 4096;

const REGION_SIZE_VAR: &CStr = c"NEXTFIT_REGION_SIZE";
const TRACE_DUMP_VAR: &CStr = c"NEXTFIT_TRACE_DUMP";

/// Heap settings, read from the environment once when a heap is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes requested by [`Heap::init_default`](crate::Heap::init_default).
    pub region_size: usize,
    /// Log the whole block table after every successful allocate or release.
    pub trace_dump: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            region_size: DEFAULT_REGION_SIZE,
            trace_dump: false,
        }
    }
}

impl Config {
    /// Reads `NEXTFIT_REGION_SIZE` and `NEXTFIT_TRACE_DUMP`. Unset or
    /// unparsable values fall back to the defaults.
    pub fn from_env() -> Config {
        let mut config = Config::default();
        if let Some(size) = getenv(REGION_SIZE_VAR).and_then(parse_usize) {
            config.region_size = size;
        }
        config.trace_dump = getenv(TRACE_DUMP_VAR).is_some();
        config
    }
}

fn getenv(key: &CStr) -> Option<&'static CStr> {
    // getenv does not allocate; the returned string lives in the environment block.
    let val = unsafe { libc::getenv(key.as_ptr()) };
    if val.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(val) })
}

fn parse_usize(raw: &CStr) -> Option<usize> {
    raw.to_str().ok()?.trim().parse().ok()
}
