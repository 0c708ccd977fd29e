//! Storages that do not need an external service
mod memory_storage;

pub use memory_storage::MemoryStorage;
