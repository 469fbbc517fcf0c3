//! Deployment row model.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use studyhub_core::deployment::Deployment;
use studyhub_core::types::{EntityId, Timestamp};

/// A row from the `deployments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeploymentRow {
    pub id: EntityId,
    pub name: String,
    pub status: String,
    pub version: i32,
    pub user_activation_code: String,
    pub manager_activation_code: String,
    pub proxy_activation_code: String,
    pub document: Json<Deployment>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DeploymentRow {
    /// The stored document, with the mirrored columns taking precedence.
    pub fn into_deployment(self) -> Deployment {
        let mut deployment = self.document.0;
        deployment.id = Some(self.id);
        deployment.name = self.name;
        deployment.version = self.version;
        deployment.user_activation_code = Some(self.user_activation_code);
        deployment.manager_activation_code = Some(self.manager_activation_code);
        deployment.proxy_activation_code = Some(self.proxy_activation_code);
        deployment.created_at = Some(self.created_at);
        deployment.updated_at = Some(self.updated_at);
        deployment
    }
}
