//! Bundled [`TaskProvider`](crate::sync::TaskProvider) implementations

mod json_file;
mod memory;

pub use json_file::JsonFileProvider;
pub use memory::MemoryProvider;
