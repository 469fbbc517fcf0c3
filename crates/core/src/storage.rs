//! Blob storage contract, backend kinds, and backend config validation.
//!
//! The core never talks to a storage service directly; it goes through
//! [`AssetStorage`], implemented by the storage crate.

use async_trait::async_trait;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Storage contract
// ---------------------------------------------------------------------------

/// Failure reported by an [`AssetStorage`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Worth retrying (throttling, timeouts, 5xx).
    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Storage error: {0}")]
    Fatal(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { bucket, key } => {
                CoreError::InvalidSource(format!("Asset {bucket}/{key} does not exist"))
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

/// Blob storage operations needed to clone a deployment.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Whether an object exists at `bucket`/`key`.
    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Server-side copy of `src_key` to `dst_key` within `bucket`.
    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str)
        -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// Backend kinds
// ---------------------------------------------------------------------------

/// Storage backend selectable through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendType {
    S3,
    Memory,
}

impl StorageBackendType {
    /// Parse from the configured backend name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(CoreError::Validation(format!(
                "Unknown storage backend type '{other}'. Must be one of: s3, memory"
            ))),
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::S3 => "Amazon S3 / Compatible",
            Self::Memory => "In-memory",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Memory => "memory",
        }
    }
}

// ---------------------------------------------------------------------------
// Backend config validation
// ---------------------------------------------------------------------------

/// Validate that `config` contains the required keys for `backend`.
///
/// - `s3`: requires `region` (string); `endpoint_url`, when present, must be http(s)
/// - `memory`: no requirements
pub fn validate_backend_config(
    backend: StorageBackendType,
    config: &serde_json::Value,
) -> Result<(), CoreError> {
    let obj = config
        .as_object()
        .ok_or_else(|| CoreError::Validation("Backend config must be a JSON object".into()))?;

    match backend {
        StorageBackendType::S3 => {
            require_string_field(obj, "region", backend)?;
            if let Some(endpoint) = obj.get("endpoint_url").and_then(|v| v.as_str()) {
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(CoreError::Validation(format!(
                        "S3 endpoint_url must be an http(s) URL, got '{endpoint}'"
                    )));
                }
            }
        }
        StorageBackendType::Memory => {}
    }

    Ok(())
}

fn require_string_field(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    backend: StorageBackendType,
) -> Result<(), CoreError> {
    match obj.get(field) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "Backend type '{}' requires a non-empty string field '{field}' in config",
            backend.name()
        ))),
    }
}
