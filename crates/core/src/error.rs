use crate::types::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The source of a clone is unusable (e.g. its icon asset is missing).
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Side effects happened (copied assets) but no deployment was persisted.
    #[error(
        "Clone of deployment {deployment_id} aborted after copying {copied_assets} asset(s): {reason}"
    )]
    PartialClone {
        deployment_id: EntityId,
        copied_assets: usize,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
