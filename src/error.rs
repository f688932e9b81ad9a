//! Error types shared by every layer of the simulator.

use std::path::PathBuf;

use thiserror::Error;

use crate::vm_manager::Phase;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the bit-field conversions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid hex digit: {0:?}")]
    InvalidDigit(char),

    #[error("Invalid binary digit: {0:?}")]
    InvalidBit(char),

    #[error("Value {value} does not fit in {width} bits")]
    FieldOverflow { value: u64, width: u32 },

    #[error("Cannot read a value from an empty bit field")]
    EmptyField,
}

/// Rejected memory layout parameters. The previous configuration is untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Memory sizes must be positive")]
    ZeroSize,

    #[error("Virtual memory size ({virtual_kb} KB) must be larger than the page size ({page_kb} KB)")]
    PageLargerThanVirtual { virtual_kb: u32, page_kb: u32 },

    #[error("Virtual memory size ({0} KB) must be a multiple of 2")]
    OddVirtualSize(u32),

    #[error("Virtual memory size ({virtual_kb} KB) must be a multiple of the page size ({page_kb} KB)")]
    NotPageMultiple { virtual_kb: u32, page_kb: u32 },

    #[error("Virtual memory must hold at least two pages")]
    TooFewPages,

    #[error("Layout needs {index_bits} index bits, maximum is {max}")]
    TooManyPages { index_bits: u32, max: u32 },
}

/// Setup commits that break a page table invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Exactly {expected} present bits must be 1, found {actual}")]
    PresentCountMismatch { expected: usize, actual: usize },

    #[error("Physical page indexes must be between 0 and {max} with no duplicates")]
    PhysicalAssignmentInvalid { max: u64 },

    #[error("Virtual page {0} does not exist")]
    UnknownPage(u64),

    #[error("Virtual page {0} is not present")]
    NotPresent(u64),

    #[error("Arrival queue must list every present page once ({expected} pages), found {actual}")]
    QueueMismatch { expected: usize, actual: usize },
}

/// Arrival queue operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Page {0} is already in the arrival queue")]
    DuplicateInQueue(u64),

    #[error("Arrival queue is empty")]
    QueueEmpty,

    #[error("Queue position {position} is out of range (length {len})")]
    PositionOutOfRange { position: usize, len: usize },
}

/// Malformed or out-of-range translation requests. No state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a hex number in order to convert")]
    Empty,

    #[error("Invalid hex address {0:?}: use digits 0-9, a-f or A-F")]
    InvalidHex(String),

    #[error("Address {input} exceeds the maximum {kind} address {max}")]
    AddressTooWide {
        input: String,
        kind: &'static str,
        max: String,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Operation requires the {expected} phase, session is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Setup line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Failed to encode result: {0}")]
    Json(#[from] serde_json::Error),
}
