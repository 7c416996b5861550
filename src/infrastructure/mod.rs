//! Storage adapters implementing the `KeyValueStore` port.

pub mod file;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
