//! YAML manifest of desired-state records.
//!
//! ```text
//! artifacts:
//!   - path: /opt/app/app.jar
//!     server: https://bamboo.example.com
//!     plan: APP-REL
//!     build: latest
//!     artifact_path: shared/app.jar
//! ```
//!
//! Every record is validated on load and `path` must be unique, since it
//! identifies the managed resource.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::types::ArtifactSpec;

/// Root of a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Manifest {
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
}

impl Manifest {
    /// Validate every record and reject duplicate target paths.
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut seen = HashSet::new();
        for spec in &self.artifacts {
            spec.validate()?;
            if !seen.insert(spec.path.as_path()) {
                return Err(SpecError::DuplicatePath {
                    path: spec.path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Parse a manifest from YAML text. `origin` is only used for error context.
pub fn parse(contents: &str, origin: &Path) -> Result<Manifest, SpecError> {
    let manifest: Manifest = serde_yaml::from_str(contents).map_err(|e| SpecError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;
    manifest.validate()?;
    Ok(manifest)
}

/// Load and validate the manifest at `path`.
///
/// Returns `SpecError::ManifestNotFound` if absent,
/// `SpecError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Manifest, SpecError> {
    if !path.exists() {
        return Err(SpecError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| SpecError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&contents, path)
}
