//! Handlers for the `/deployments` resource.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use studyhub_core::clone::{CloneDeploymentRequest, DeploymentCloner};
use studyhub_core::deployment::Deployment;
use studyhub_core::error::CoreError;
use studyhub_core::localizable::TranslationMap;
use studyhub_core::translation::{
    generate_master_translation as extract_master_translation, localizable_field_paths,
    localization_for, localized_view, validate_locale,
};
use studyhub_core::types::EntityId;
use studyhub_db::repositories::DeploymentRepo;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for [`get_by_id`].
#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    /// Substitute placeholders with this locale's text.
    pub locale: Option<String>,
}

/// Response body of a successful clone.
#[derive(Debug, Serialize)]
pub struct ClonedDeployment {
    pub id: EntityId,
}

/// Request body of [`update_localizations`].
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocalizationsRequest {
    #[validate(custom(function = "validate_locale_keys"))]
    pub localizations: BTreeMap<String, TranslationMap>,
}

fn validate_locale_keys(
    localizations: &BTreeMap<String, TranslationMap>,
) -> Result<(), ValidationError> {
    if localizations.keys().all(|locale| validate_locale(locale).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("locale"))
    }
}

async fn load(state: &AppState, id: EntityId) -> AppResult<Deployment> {
    DeploymentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Deployment",
            id,
        }))
}

/// POST /api/v1/deployments
pub async fn create(
    State(state): State<AppState>,
    Json(mut input): Json<Deployment>,
) -> AppResult<(StatusCode, Json<DataResponse<Deployment>>)> {
    input.validate()?;
    input.prepare_new(Utc::now());

    let deployment = DeploymentRepo::insert_with_fresh_codes(&state.pool, &input).await?;
    tracing::info!(
        deployment_id = ?deployment.id,
        name = %deployment.name,
        "Deployment created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: deployment })))
}

/// GET /api/v1/deployments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(params): Query<RetrieveParams>,
) -> AppResult<Json<DataResponse<Deployment>>> {
    let deployment = load(&state, id).await?;
    let data = match params.locale.as_deref() {
        Some(locale) => {
            validate_locale(locale)?;
            localized_view(&deployment, locale)
        }
        None => deployment,
    };
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/deployments/clone
///
/// Stages and copies assets in the cloner, then persists the new aggregate
/// in one transaction. A failed insert after copies succeeded is reported
/// as a partial clone.
pub async fn clone_deployment(
    State(state): State<AppState>,
    Json(input): Json<CloneDeploymentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ClonedDeployment>>)> {
    input.validate()?;
    let source = load(&state, input.reference_id).await?;

    let cloner = DeploymentCloner::new(state.storage.clone(), state.config.clone_config());
    let staged = cloner
        .clone_deployment(&source, &input.name, Utc::now())
        .await?;
    let id = staged.id()?;

    if let Err(err) = DeploymentRepo::insert_with_fresh_codes(&state.pool, &staged.deployment).await
    {
        if staged.report.copied_assets == 0 {
            return Err(err.into());
        }
        return Err(AppError::Core(CoreError::PartialClone {
            deployment_id: id,
            copied_assets: staged.report.copied_assets,
            reason: err.to_string(),
        }));
    }

    tracing::info!(
        source_deployment_id = %input.reference_id,
        deployment_id = %id,
        copied_assets = staged.report.copied_assets,
        dropped_article_refs = staged.report.dropped_article_refs,
        unresolved_key_action_refs = staged.report.unresolved_key_action_refs,
        "Deployment cloned",
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ClonedDeployment { id },
        }),
    ))
}

/// GET /api/v1/deployments/{id}/localizable-fields
pub async fn localizable_fields(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let deployment = load(&state, id).await?;
    Ok(Json(DataResponse {
        data: localizable_field_paths(&deployment),
    }))
}

/// POST /api/v1/deployments/{id}/generate-master-translation
pub async fn generate_master_translation(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Deployment>>> {
    let deployment = load(&state, id).await?;
    let rewritten = extract_master_translation(&deployment)?;

    let saved =
        DeploymentRepo::save_master_translation(&state.pool, id, deployment.version, &rewritten)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Conflict(format!(
                    "Deployment {id} was modified while generating its master translation"
                )))
            })?;

    tracing::info!(deployment_id = %id, version = saved.version, "Master translation generated");
    Ok(Json(DataResponse { data: saved }))
}

/// POST /api/v1/deployments/{id}/localizations
pub async fn update_localizations(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(input): Json<UpdateLocalizationsRequest>,
) -> AppResult<Json<DataResponse<BTreeMap<String, TranslationMap>>>> {
    input.validate()?;
    let deployment = DeploymentRepo::update_localizations(&state.pool, id, &input.localizations)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Deployment",
            id,
        }))?;

    tracing::info!(
        deployment_id = %id,
        locales = ?input.localizations.keys().collect::<Vec<_>>(),
        "Localizations updated",
    );
    Ok(Json(DataResponse {
        data: deployment.localizations,
    }))
}

/// GET /api/v1/deployments/{id}/localizations/{locale}
///
/// Falls back to the master (`en`) table when the locale has none.
pub async fn get_localization(
    State(state): State<AppState>,
    Path((id, locale)): Path<(EntityId, String)>,
) -> AppResult<Json<DataResponse<TranslationMap>>> {
    validate_locale(&locale)?;
    let deployment = load(&state, id).await?;
    let table = localization_for(&deployment.localizations, &locale)
        .cloned()
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Localization",
            id,
        }))?;
    Ok(Json(DataResponse { data: table }))
}
