//! Repository for the `deployments` table.

use std::collections::BTreeMap;

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use studyhub_core::activation::{ActivationCodeKind, ActivationCodes};
use studyhub_core::deployment::Deployment;
use studyhub_core::localizable::TranslationMap;
use studyhub_core::types::{new_id, EntityId};

use crate::models::deployment::DeploymentRow;
use crate::models::revision::ChangeType;
use crate::repositories::DeploymentRevisionRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, name, status, version, user_activation_code, manager_activation_code, \
    proxy_activation_code, document, created_at, updated_at";

/// Attempts at finding an unused code, and at inserting when a concurrent
/// insert claims the same code first.
const MAX_CODE_ATTEMPTS: usize = 5;

/// Provides persistence for whole deployment aggregates.
pub struct DeploymentRepo;

impl DeploymentRepo {
    /// Insert a new deployment with freshly generated activation codes.
    ///
    /// Codes are checked against stored deployments inside the transaction;
    /// a unique-constraint race with a concurrent insert restarts the
    /// transaction with new codes.
    pub async fn insert_with_fresh_codes(
        pool: &PgPool,
        deployment: &Deployment,
    ) -> Result<Deployment, sqlx::Error> {
        let mut document = deployment.clone();
        let id = *document.id.get_or_insert_with(new_id);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut tx = pool.begin().await?;
            let codes = Self::unused_codes(&mut *tx).await?;
            document.set_activation_codes(&codes);

            match Self::insert_document(&mut *tx, id, &document).await {
                Ok(row) => {
                    tx.commit().await?;
                    tracing::info!(deployment_id = %id, "Deployment stored");
                    return Ok(row.into_deployment());
                }
                Err(err) if is_activation_code_conflict(&err) && attempt < MAX_CODE_ATTEMPTS => {
                    tracing::warn!(
                        deployment_id = %id,
                        attempt,
                        "Activation code taken concurrently, retrying",
                    );
                    tx.rollback().await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Find a deployment by id.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Deployment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM deployments WHERE id = $1");
        let row = sqlx::query_as::<_, DeploymentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(DeploymentRow::into_deployment))
    }

    /// Store a master-translated document, bump the version and snapshot it.
    ///
    /// `expected_version` is the version the document was generated from.
    /// Returns `None` if the deployment is gone or was changed since.
    pub async fn save_master_translation(
        pool: &PgPool,
        id: EntityId,
        expected_version: i32,
        document: &Deployment,
    ) -> Result<Option<Deployment>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut document = document.clone();
        document.version = expected_version + 1;

        let query = format!(
            "UPDATE deployments SET document = $3, version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DeploymentRow>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(Json(&document))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let stored = row.into_deployment();

        DeploymentRevisionRepo::insert(
            &mut *tx,
            id,
            stored.version,
            ChangeType::MultiLanguageConversion,
            &stored,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(stored))
    }

    /// Replace the translation tables of the given locales; others are kept.
    pub async fn update_localizations(
        pool: &PgPool,
        id: EntityId,
        localizations: &BTreeMap<String, TranslationMap>,
    ) -> Result<Option<Deployment>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM deployments WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, DeploymentRow>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut document = row.into_deployment();
        for (locale, table) in localizations {
            document.localizations.insert(locale.clone(), table.clone());
        }

        let query = format!(
            "UPDATE deployments SET document = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DeploymentRow>(&query)
            .bind(id)
            .bind(Json(&document))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row.into_deployment()))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn insert_document(
        conn: &mut PgConnection,
        id: EntityId,
        document: &Deployment,
    ) -> Result<DeploymentRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO deployments \
                (id, name, status, version, user_activation_code, manager_activation_code, \
                 proxy_activation_code, document) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeploymentRow>(&query)
            .bind(id)
            .bind(&document.name)
            .bind(document.status.as_str())
            .bind(document.version)
            .bind(&document.user_activation_code)
            .bind(&document.manager_activation_code)
            .bind(&document.proxy_activation_code)
            .bind(Json(document))
            .fetch_one(conn)
            .await
    }

    /// Generate codes, regenerating any that a stored deployment already uses.
    async fn unused_codes(conn: &mut PgConnection) -> Result<ActivationCodes, sqlx::Error> {
        let mut codes = ActivationCodes::generate();
        for kind in ActivationCodeKind::ALL {
            for _ in 0..MAX_CODE_ATTEMPTS {
                if !Self::code_in_use(conn, kind, codes.get(kind)).await? {
                    break;
                }
                codes.regenerate(kind);
            }
        }
        Ok(codes)
    }

    async fn code_in_use(
        conn: &mut PgConnection,
        kind: ActivationCodeKind,
        code: &str,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM deployments WHERE {} = $1)",
            kind.column()
        );
        let row: (bool,) = sqlx::query_as(&query).bind(code).fetch_one(conn).await?;
        Ok(row.0)
    }
}

/// Whether `err` is a unique violation on one of the activation code columns.
fn is_activation_code_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint().is_some_and(|c| {
                    c.starts_with("uq_deployments_") && c.ends_with("_activation_code")
                })
        }
        _ => false,
    }
}
