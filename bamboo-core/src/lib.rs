//! Bamboo artifact core library — desired-state types, validation, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes, [`BuildSelector`] and the [`ArtifactSpec`] record
//! - [`error`] — [`SpecError`]
//! - [`manifest`] — YAML manifest of desired-state records

pub mod error;
pub mod manifest;
pub mod types;

pub use error::SpecError;
pub use manifest::Manifest;
pub use types::{meta_path_for, ArtifactSpec, BuildSelector, Ensure, PlanKey, ServerUrl};
