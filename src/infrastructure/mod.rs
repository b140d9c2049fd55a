//! Infrastructure adapters: storage backends and payment-gateway clients.

pub mod gateway;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
