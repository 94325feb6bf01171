pub mod compare;
pub mod error;
pub mod page;
pub mod record;
pub mod value;

// Common type aliases
pub type FileId = i32;
pub type PageNo = i32;
pub type SlotNo = u32;
pub type TransactionId = u64;

pub const PAGE_SIZE: usize = 4096;
pub const BUFFER_POOL_SIZE: usize = 256; // frames in the shared pool

/// File id reserved for temporary (spill) pages. Persisted tables always get fds >= 0.
pub const TEMP_FILE_ID: FileId = -2;

pub use page::{PageId, Rid};
