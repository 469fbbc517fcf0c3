//! Repository for the `deployment_revisions` table.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use studyhub_core::deployment::Deployment;
use studyhub_core::types::{new_id, EntityId};

use crate::models::revision::{ChangeType, DeploymentRevision};

const COLUMNS: &str = "id, deployment_id, version, change_type, snapshot, created_at";

/// Append-only access to deployment revision snapshots.
pub struct DeploymentRevisionRepo;

impl DeploymentRevisionRepo {
    /// Record a snapshot on an open connection or transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        deployment_id: EntityId,
        version: i32,
        change_type: ChangeType,
        snapshot: &Deployment,
    ) -> Result<DeploymentRevision, sqlx::Error> {
        let query = format!(
            "INSERT INTO deployment_revisions (id, deployment_id, version, change_type, snapshot) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeploymentRevision>(&query)
            .bind(new_id())
            .bind(deployment_id)
            .bind(version)
            .bind(change_type.as_str())
            .bind(Json(snapshot))
            .fetch_one(conn)
            .await
    }

    /// All revisions of a deployment, oldest first.
    pub async fn list_for_deployment(
        pool: &PgPool,
        deployment_id: EntityId,
    ) -> Result<Vec<DeploymentRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM deployment_revisions \
             WHERE deployment_id = $1 ORDER BY version"
        );
        sqlx::query_as::<_, DeploymentRevision>(&query)
            .bind(deployment_id)
            .fetch_all(pool)
            .await
    }
}
