//! Deployment revision model.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use studyhub_core::deployment::Deployment;
use studyhub_core::types::{EntityId, Timestamp};

/// Why a revision snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Text was moved into the master translation table.
    MultiLanguageConversion,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultiLanguageConversion => "MULTI_LANGUAGE_CONVERSION",
        }
    }
}

/// A row from the `deployment_revisions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeploymentRevision {
    pub id: EntityId,
    pub deployment_id: EntityId,
    pub version: i32,
    pub change_type: String,
    pub snapshot: Json<Deployment>,
    pub created_at: Timestamp,
}
