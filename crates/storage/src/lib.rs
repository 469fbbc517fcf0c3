//! [`AssetStorage`](studyhub_core::storage::AssetStorage) backends.
//!
//! - [`S3AssetStorage`]: Amazon S3 or any S3-compatible store.
//! - [`MemoryAssetStorage`]: process-local, for tests and local development.

pub mod config;
pub mod memory;
pub mod s3;

use std::sync::Arc;

use studyhub_core::storage::{AssetStorage, StorageBackendType};

pub use config::StorageConfig;
pub use memory::MemoryAssetStorage;
pub use s3::S3AssetStorage;

/// Build the backend selected by `config`.
pub async fn build_storage(config: &StorageConfig) -> Arc<dyn AssetStorage> {
    match config.backend {
        StorageBackendType::S3 => Arc::new(
            S3AssetStorage::connect(config.region.clone(), config.endpoint_url.clone()).await,
        ),
        StorageBackendType::Memory => Arc::new(MemoryAssetStorage::new()),
    }
}
