//! Pointers into blob storage.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Location of a stored binary object. Never owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub bucket: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl AssetRef {
    /// The same object location under a different key.
    pub fn with_key(&self, key: String) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key,
            region: self.region.clone(),
        }
    }
}

/// Storage key prefix under which a deployment's assets live.
pub fn deployment_key_prefix(deployment_id: EntityId) -> String {
    format!("deployment/{deployment_id}/")
}

/// Re-scope an object key from one deployment to another.
///
/// Keys that embed the source deployment id get it swapped for the target
/// id; keys that do not are nested under the target's prefix so the copy
/// never lands on the source key.
pub fn rescope_key(key: &str, from: EntityId, to: EntityId) -> String {
    let from = from.to_string();
    if key.contains(&from) {
        key.replace(&from, &to.to_string())
    } else {
        format!("{}{}", deployment_key_prefix(to), key.trim_start_matches('/'))
    }
}
