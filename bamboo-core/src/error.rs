//! Error types for bamboo-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while reading or validating desired state.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The target path must be absolute.
    #[error("'{path}' must be absolute")]
    RelativePath { path: PathBuf },

    /// The target path has no file name component (e.g. `/`).
    #[error("'{path}' does not name a file")]
    MissingFileName { path: PathBuf },

    /// A required property was absent or empty.
    #[error("{field} must be given in bamboo_artifact[{resource}]")]
    MissingField {
        field: &'static str,
        resource: String,
    },

    /// The build selector was neither a number nor `latest`.
    #[error("build must be a number or 'latest', got '{value}'")]
    InvalidBuild { value: String },

    /// Two manifest records share the same target path.
    #[error("duplicate artifact path {path} in manifest")]
    DuplicatePath { path: PathBuf },

    /// The manifest file did not exist.
    #[error("manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// Underlying I/O failure while reading the manifest.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
