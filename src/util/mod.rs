//! Small OS helpers shared by the collectors.

/// Fallback when `sysconf` cannot report the page size.
const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Memory page size in bytes, used to convert `rss` pages to bytes.
pub fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions and only reads a constant.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        DEFAULT_PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 1024);
        assert!(size.is_power_of_two());
    }
}
