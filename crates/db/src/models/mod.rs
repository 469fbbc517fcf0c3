//! Row structs for the persisted tables.
//!
//! Deployments are stored as a JSONB document with the columns that need
//! indexes or unique constraints mirrored alongside it.

pub mod deployment;
pub mod revision;
