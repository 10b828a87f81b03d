//! Managed properties and their in-sync comparison strategies.
//!
//! Each property has a fixed getter backed by [`LocalMetadata`] and a
//! [`Comparator`]. Only `build` needs the resolver; every other property is
//! compared structurally against the cached metadata.

use std::fmt;

use bamboo_core::{ArtifactSpec, BuildSelector};

use crate::error::SyncError;
use crate::meta_store::LocalMetadata;
use crate::resolver::LatestBuild;

/// A property declared on the artifact resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Server,
    Plan,
    Build,
    ArtifactPath,
}

/// How the current value of a property is compared with the desired one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Plain equality against the recorded value.
    Structural,
    /// [`build_in_sync`]: may consult the resolver for `latest`.
    BuildAware,
}

/// Typed value of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Build(BuildSelector),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => s.fmt(f),
            PropertyValue::Build(b) => b.fmt(f),
        }
    }
}

impl Property {
    /// Declaration order; evaluation walks properties in this order.
    pub const ALL: [Property; 4] = [
        Property::Server,
        Property::Plan,
        Property::Build,
        Property::ArtifactPath,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Property::Server => "server",
            Property::Plan => "plan",
            Property::Build => "build",
            Property::ArtifactPath => "artifact_path",
        }
    }

    pub fn comparator(self) -> Comparator {
        match self {
            Property::Build => Comparator::BuildAware,
            _ => Comparator::Structural,
        }
    }

    /// Current value, as recorded by the last install.
    pub fn read(self, meta: &LocalMetadata) -> Option<PropertyValue> {
        match self {
            Property::Server => meta.server.as_ref().map(|s| PropertyValue::Text(s.0.clone())),
            Property::Plan => meta.plan.as_ref().map(|p| PropertyValue::Text(p.0.clone())),
            Property::Build => meta
                .build
                .map(|n| PropertyValue::Build(BuildSelector::Number(n))),
            Property::ArtifactPath => meta.artifact_path.clone().map(PropertyValue::Text),
        }
    }

    /// Desired value from the [`ArtifactSpec`].
    pub fn should(self, spec: &ArtifactSpec) -> PropertyValue {
        match self {
            Property::Server => PropertyValue::Text(spec.server.0.clone()),
            Property::Plan => PropertyValue::Text(spec.plan.0.clone()),
            Property::Build => PropertyValue::Build(spec.build),
            Property::ArtifactPath => PropertyValue::Text(spec.artifact_path.clone()),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the recorded build satisfies the desired selector.
///
/// A literal selector is compared directly and never calls `latest`. For
/// `latest`, a [`LatestBuild::Skip`] always counts as in sync, even with no
/// recorded build: a failed remote build must not force a change.
pub fn build_in_sync<F>(desired: BuildSelector, current: Option<u64>, latest: F) -> Result<bool, SyncError>
where
    F: FnOnce() -> Result<LatestBuild, SyncError>,
{
    match desired {
        BuildSelector::Number(n) => Ok(current == Some(n)),
        BuildSelector::Latest => match latest()? {
            LatestBuild::Skip { .. } => Ok(true),
            LatestBuild::Successful(n) => Ok(current == Some(n)),
        },
    }
}
