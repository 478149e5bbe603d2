//! 存储实现

pub mod file;
pub mod memory;

pub use file::{FileRecordStore, FileTemplateStore};
pub use memory::{MemoryRecordStore, MemorySiteStore, MemoryTemplateStore};
