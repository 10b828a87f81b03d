//! Error types for bamboo-sync.

use std::path::PathBuf;

use thiserror::Error;

use bamboo_core::SpecError;

/// Boxed cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can arise from resolving, downloading, and installing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced an HTTP response (DNS, refused, timeout).
    #[error("request failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The server answered with a non-2xx status.
    #[error("bad http response for {url}: {status} {status_text}")]
    Remote {
        url: String,
        status: u16,
        status_text: String,
    },

    /// An apply was requested but the latest remote build did not succeed.
    #[error("no update can be made, as the latest build has failed (build {number} is {state})")]
    BuildNotSuccessful { number: u64, state: String },

    /// The build-result document could not be parsed.
    #[error("unexpected build result document from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: quick_xml::DeError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (metadata store).
    #[error("metadata YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The desired state failed validation.
    #[error("invalid resource: {0}")]
    Spec(#[from] SpecError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
