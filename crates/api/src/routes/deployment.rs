//! Route definitions for the `/deployments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::deployment;
use crate::state::AppState;

/// Routes mounted at `/deployments`.
///
/// ```text
/// POST   /                                  -> create
/// POST   /clone                             -> clone_deployment
/// GET    /{id}?locale=                      -> get_by_id
/// GET    /{id}/localizable-fields           -> localizable_fields
/// POST   /{id}/generate-master-translation  -> generate_master_translation
/// POST   /{id}/localizations                -> update_localizations
/// GET    /{id}/localizations/{locale}       -> get_localization
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(deployment::create))
        .route("/clone", post(deployment::clone_deployment))
        .route("/{id}", get(deployment::get_by_id))
        .route(
            "/{id}/localizable-fields",
            get(deployment::localizable_fields),
        )
        .route(
            "/{id}/generate-master-translation",
            post(deployment::generate_master_translation),
        )
        .route(
            "/{id}/localizations",
            post(deployment::update_localizations),
        )
        .route(
            "/{id}/localizations/{locale}",
            get(deployment::get_localization),
        )
}
