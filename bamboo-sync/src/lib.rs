//! # bamboo-sync
//!
//! Keeps a Bamboo build artifact installed at a target path.
//!
//! Call [`evaluate`] to run one evaluation cycle for an [`ArtifactSpec`]:
//! it compares recorded metadata with the desired state, resolves `latest`
//! against the server when needed, and downloads and installs the artifact
//! atomically when they diverge.
//!
//! [`ArtifactSpec`]: bamboo_core::ArtifactSpec

pub mod companion;
pub mod error;
pub mod http;
pub mod installer;
pub mod meta_store;
pub mod pipeline;
pub mod property;
pub mod provider;
pub mod resolver;

pub use error::SyncError;
pub use http::{HttpClient, HttpResponse, UreqClient};
pub use meta_store::LocalMetadata;
pub use pipeline::{evaluate, Change, Evaluation, Outcome};
pub use property::{build_in_sync, Property, PropertyValue};
pub use provider::ArtifactProvider;
pub use resolver::{BuildResolver, LatestBuild};
