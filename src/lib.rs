pub mod codec;
pub mod constants;
pub mod error;
pub mod fifo;
pub mod io;
pub mod layout;
pub mod page_table;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use error::{Error, Result};
pub use layout::MemoryLayout;
pub use translation::{Direction, Outcome, TranslationResponse};
pub use vm_manager::{Phase, VmManager};
