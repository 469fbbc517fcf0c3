//! Domain core of the study configuration service.
//!
//! Holds the deployment aggregate model and the two tree walks performed
//! over it: localization extraction and whole-aggregate cloning.

pub mod activation;
pub mod asset;
pub mod clone;
pub mod consent;
pub mod deployment;
pub mod error;
pub mod learn;
pub mod localizable;
pub mod module_config;
pub mod profile;
pub mod remap;
pub mod retry;
pub mod storage;
pub mod translation;
pub mod types;
