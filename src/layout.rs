use crate::constants::*;
use crate::error::ConfigError;

/// Bit widths of the simulated address spaces.
///
/// A virtual address is `index_bits` of page index followed by `offset_bits`
/// of offset. Physical memory is half the virtual size, so a physical address
/// is one bit shorter and its frame field is `index_bits - 1` bits wide.
///
/// Only built through `from_sizes` or `Default`, so `index_bits` is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    virtual_mem_kb: u32,
    page_kb: u32,
    total_bits: u32,
    index_bits: u32,
    offset_bits: u32,
}

/// Smallest `n` such that `2^n >= value`. `value` must be positive.
#[inline]
fn ceil_log2(value: u64) -> u32 {
    value.next_power_of_two().trailing_zeros()
}

impl MemoryLayout {
    /// Derive the layout from sizes given in KB.
    pub fn from_sizes(virtual_mem_kb: u32, page_kb: u32) -> Result<Self, ConfigError> {
        if virtual_mem_kb == 0 || page_kb == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if virtual_mem_kb < page_kb {
            return Err(ConfigError::PageLargerThanVirtual {
                virtual_kb: virtual_mem_kb,
                page_kb,
            });
        }
        if virtual_mem_kb % 2 != 0 {
            return Err(ConfigError::OddVirtualSize(virtual_mem_kb));
        }
        if virtual_mem_kb % page_kb != 0 {
            return Err(ConfigError::NotPageMultiple {
                virtual_kb: virtual_mem_kb,
                page_kb,
            });
        }

        let total_bits = ceil_log2(virtual_mem_kb as u64 * KB);
        let offset_bits = ceil_log2(page_kb as u64 * KB);
        let index_bits = total_bits - offset_bits;

        if index_bits == 0 {
            return Err(ConfigError::TooFewPages);
        }
        if index_bits > MAX_INDEX_BITS {
            return Err(ConfigError::TooManyPages {
                index_bits,
                max: MAX_INDEX_BITS,
            });
        }

        Ok(MemoryLayout {
            virtual_mem_kb,
            page_kb,
            total_bits,
            index_bits,
            offset_bits,
        })
    }

    #[inline]
    pub fn virtual_mem_kb(&self) -> u32 {
        self.virtual_mem_kb
    }

    #[inline]
    pub fn page_kb(&self) -> u32 {
        self.page_kb
    }

    /// Width of a whole virtual address.
    #[inline]
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Width of the page index field of a virtual address.
    #[inline]
    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    #[inline]
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    #[inline]
    pub fn virtual_mem_bytes(&self) -> u64 {
        self.virtual_mem_kb as u64 * KB
    }

    #[inline]
    pub fn page_bytes(&self) -> u64 {
        self.page_kb as u64 * KB
    }

    #[inline]
    pub fn physical_mem_bytes(&self) -> u64 {
        self.virtual_mem_bytes() / PHYSICAL_DIVISOR
    }

    /// Width of the frame field of a physical address. Zero when there is a
    /// single frame.
    #[inline]
    pub fn frame_bits(&self) -> u32 {
        self.index_bits - 1
    }

    /// Width of a whole physical address.
    #[inline]
    pub fn physical_bits(&self) -> u32 {
        self.total_bits - 1
    }

    /// Number of virtual pages (page table entries).
    #[inline]
    pub fn page_count(&self) -> u64 {
        1 << self.index_bits
    }

    /// Number of physical frames, which is also how many pages can be present.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        1 << self.frame_bits()
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        MemoryLayout {
            virtual_mem_kb: DEFAULT_VIRTUAL_MEM_KB,
            page_kb: DEFAULT_PAGE_KB,
            total_bits: 16,
            index_bits: 3,
            offset_bits: 13,
        }
    }
}

impl std::fmt::Display for MemoryLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "virtual {} KB ({} bytes), page {} KB ({} bytes), physical {} KB ({} bytes), bits total={} index={} offset={}",
            self.virtual_mem_kb,
            self.virtual_mem_bytes(),
            self.page_kb,
            self.page_bytes(),
            self.physical_mem_bytes() / KB,
            self.physical_mem_bytes(),
            self.total_bits,
            self.index_bits,
            self.offset_bits
        )
    }
}
