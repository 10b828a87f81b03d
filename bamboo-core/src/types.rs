//! Domain types for a managed Bamboo artifact.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SpecError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Base URL of a Bamboo server, e.g. `https://bamboo.example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerUrl(pub String);

impl ServerUrl {
    /// Append `suffix` to the base URL, tolerating a trailing `/` on the base.
    pub fn endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.0.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ServerUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServerUrl {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A plan key on the build server, e.g. `APP-REL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanKey(pub String);

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PlanKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlanKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether the artifact should be present at its target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => write!(f, "present"),
            Ensure::Absent => write!(f, "absent"),
        }
    }
}

/// Desired build: a literal build number or the symbolic `latest`.
///
/// Serialized as a bare integer or the string `latest`. Numeric strings such
/// as `"42"` are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildSelector {
    #[default]
    Latest,
    Number(u64),
}

impl BuildSelector {
    pub fn is_latest(&self) -> bool {
        matches!(self, BuildSelector::Latest)
    }
}

impl fmt::Display for BuildSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSelector::Latest => write!(f, "latest"),
            BuildSelector::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for BuildSelector {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "latest" {
            return Ok(BuildSelector::Latest);
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse::<u64>() {
                return Ok(BuildSelector::Number(n));
            }
        }
        Err(SpecError::InvalidBuild {
            value: s.to_owned(),
        })
    }
}

impl From<u64> for BuildSelector {
    fn from(n: u64) -> Self {
        BuildSelector::Number(n)
    }
}

impl Serialize for BuildSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BuildSelector::Latest => serializer.serialize_str("latest"),
            BuildSelector::Number(n) => serializer.serialize_u64(*n),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuildSelectorRepr {
    Number(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for BuildSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BuildSelectorRepr::deserialize(deserializer)? {
            BuildSelectorRepr::Number(n) => Ok(BuildSelector::Number(n)),
            BuildSelectorRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// Desired state of one managed artifact. `path` is the resource identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    #[serde(default)]
    pub ensure: Ensure,
    /// Absolute path where the artifact is installed (incl. file name).
    pub path: PathBuf,
    pub server: ServerUrl,
    pub plan: PlanKey,
    #[serde(default)]
    pub build: BuildSelector,
    /// Path to the artifact on the server, including `shared/` if appropriate.
    pub artifact_path: String,
    /// Owner of the downloaded file. Not consumed by the sync core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ArtifactSpec {
    /// Check the invariants a record must satisfy before evaluation.
    pub fn validate(&self) -> Result<(), SpecError> {
        if !self.path.is_absolute() {
            return Err(SpecError::RelativePath {
                path: self.path.clone(),
            });
        }
        if self.path.file_name().is_none() {
            return Err(SpecError::MissingFileName {
                path: self.path.clone(),
            });
        }
        let required = [
            ("server", self.server.0.as_str()),
            ("plan", self.plan.0.as_str()),
            ("artifact_path", self.artifact_path.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SpecError::MissingField {
                    field,
                    resource: self.path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Hidden metadata file co-located with the target.
    pub fn meta_file(&self) -> PathBuf {
        meta_path_for(&self.path)
    }

    /// Temporary download file co-located with the target.
    pub fn temp_file(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

/// `<dir>/.<basename>-meta.yaml` for a target at `<dir>/<basename>` — pure, no I/O.
pub fn meta_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = format!(".{name}-meta.yaml");
    match target.parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
