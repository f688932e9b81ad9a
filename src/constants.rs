pub const KB: u64 = 1024;

pub const DEFAULT_VIRTUAL_MEM_KB: u32 = 64;
pub const DEFAULT_PAGE_KB: u32 = 8;

// physical memory is always half of the virtual memory
pub const PHYSICAL_DIVISOR: u64 = 2;

pub const NIBBLE_BITS: u32 = 4;
pub const GROUP_SEPARATOR: char = ' ';

// keeps the page table small enough to build eagerly (65536 entries)
pub const MAX_INDEX_BITS: u32 = 16;
