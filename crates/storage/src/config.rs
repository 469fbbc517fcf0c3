//! Storage backend configuration.

use studyhub_core::error::CoreError;
use studyhub_core::storage::{validate_backend_config, StorageBackendType};

/// Which blob store to use and how to reach it.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    pub endpoint_url: Option<String>,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var           | Default  |
    /// |-------------------|----------|
    /// | `STORAGE_BACKEND` | `s3`     |
    /// | `S3_REGION`       | (none)   |
    /// | `S3_ENDPOINT_URL` | (none)   |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, then validate it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let backend_name = lookup("STORAGE_BACKEND").unwrap_or_else(|| "s3".into());
        let config = Self {
            backend: StorageBackendType::from_name(backend_name.trim())?,
            region: lookup("S3_REGION").filter(|v| !v.trim().is_empty()),
            endpoint_url: lookup("S3_ENDPOINT_URL").filter(|v| !v.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let mut settings = serde_json::Map::new();
        if let Some(region) = &self.region {
            settings.insert("region".into(), region.clone().into());
        }
        if let Some(endpoint) = &self.endpoint_url {
            settings.insert("endpoint_url".into(), endpoint.clone().into());
        }
        validate_backend_config(self.backend, &serde_json::Value::Object(settings))
    }
}
