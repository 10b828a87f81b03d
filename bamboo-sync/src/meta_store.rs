//! Metadata store — records the last-applied desired state next to the target.
//!
//! Persists a [`LocalMetadata`] YAML document at `<dir>/.<basename>-meta.yaml`.
//! Writes use an atomic `.tmp` + rename so readers never observe a partial
//! document. Any failure to read the file yields an empty record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bamboo_core::{meta_path_for, ArtifactSpec, Ensure, PlanKey, ServerUrl};

use crate::error::{io_err, SyncError};

/// Last-applied state of one artifact. Every field is optional because the
/// record is empty before the first successful install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Ensure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanKey>,
    /// Concrete build number; never the symbolic `latest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl LocalMetadata {
    /// Merge the desired spec with the build number that is being installed.
    pub fn from_spec(spec: &ArtifactSpec, build: u64) -> Self {
        Self {
            ensure: Some(spec.ensure),
            path: Some(spec.path.clone()),
            server: Some(spec.server.clone()),
            plan: Some(spec.plan.clone()),
            build: Some(build),
            artifact_path: Some(spec.artifact_path.clone()),
            user: spec.user.clone(),
            synced_at: Some(Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Path to the metadata file for `target`.
pub fn store_path(target: &Path) -> PathBuf {
    meta_path_for(target)
}

/// Load the metadata recorded for `target`.
///
/// Returns an empty record if the file is missing, unreadable or malformed.
pub fn load(target: &Path) -> LocalMetadata {
    let path = store_path(target);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!(
                "meta-file loading error; possibly doesn't exist yet: {}: {e}",
                path.display()
            );
            return LocalMetadata::default();
        }
    };
    match serde_yaml::from_str::<Option<LocalMetadata>>(&contents) {
        Ok(meta) => meta.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("ignoring unreadable meta-file {}: {e}", path.display());
            LocalMetadata::default()
        }
    }
}

/// Replace the metadata recorded for `target` atomically.
///
/// Writes to `<meta>.tmp` then renames to `<meta>`.
pub fn save(target: &Path, meta: &LocalMetadata) -> Result<(), SyncError> {
    let path = store_path(target);
    let yaml = serde_yaml::to_string(meta)?;

    let mut tmp = path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}
