pub mod deployment;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /deployments                                     create
/// /deployments/clone                               clone
/// /deployments/{id}                                get (optional ?locale=)
/// /deployments/{id}/localizable-fields             localizable field paths
/// /deployments/{id}/generate-master-translation    extract master (en) table
/// /deployments/{id}/localizations                  replace locale tables
/// /deployments/{id}/localizations/{locale}         one locale table
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/deployments", deployment::router())
}
