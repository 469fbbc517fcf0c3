//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod deployment_repo;
pub mod revision_repo;

pub use deployment_repo::DeploymentRepo;
pub use revision_repo::DeploymentRevisionRepo;
