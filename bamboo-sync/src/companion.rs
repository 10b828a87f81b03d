//! Companion file resources requested from the host.
//!
//! Evaluating an artifact asks the host to also manage two regular files:
//! the hidden metadata file and, unless the host already manages it, the
//! target itself. Both inherit `ensure` and the optional owner and are
//! ordered after the artifact.

use std::path::{Path, PathBuf};

use bamboo_core::{ArtifactSpec, Ensure};

/// Desired state of a companion file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEnsure {
    File,
    Absent,
}

impl From<Ensure> for FileEnsure {
    fn from(ensure: Ensure) -> Self {
        match ensure {
            Ensure::Present => FileEnsure::File,
            Ensure::Absent => FileEnsure::Absent,
        }
    }
}

/// A regular file the host should manage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResource {
    pub path: PathBuf,
    pub ensure: FileEnsure,
    pub owner: Option<String>,
}

/// Ordering edge: `source` (the artifact, by path) is evaluated before `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub source: PathBuf,
    pub target: FileResource,
}

/// The relationships to synthesize for `spec`. `host_manages` reports whether
/// the host already declares a file resource at a path.
pub fn companion_resources(
    spec: &ArtifactSpec,
    host_manages: impl Fn(&Path) -> bool,
) -> Vec<Relationship> {
    let file = |path: PathBuf| FileResource {
        path,
        ensure: spec.ensure.into(),
        owner: spec.user.clone(),
    };

    let mut reqs = vec![Relationship {
        source: spec.path.clone(),
        target: file(spec.meta_file()),
    }];
    if !host_manages(&spec.path) {
        reqs.push(Relationship {
            source: spec.path.clone(),
            target: file(spec.path.clone()),
        });
    }
    reqs
}

/// Users that must exist before this artifact is evaluated.
pub fn required_users(spec: &ArtifactSpec) -> Vec<String> {
    spec.user.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bamboo_core::{BuildSelector, PlanKey, ServerUrl};

    fn spec(ensure: Ensure, user: Option<&str>) -> ArtifactSpec {
        ArtifactSpec {
            ensure,
            path: PathBuf::from("/opt/app/app.jar"),
            server: ServerUrl::from("http://ci"),
            plan: PlanKey::from("REL"),
            build: BuildSelector::Latest,
            artifact_path: "app.jar".to_string(),
            user: user.map(str::to_string),
        }
    }

    #[test]
    fn present_requests_meta_and_target_files() {
        let reqs = companion_resources(&spec(Ensure::Present, Some("deploy")), |_| false);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].target.path, PathBuf::from("/opt/app/.app.jar-meta.yaml"));
        assert_eq!(reqs[1].target.path, PathBuf::from("/opt/app/app.jar"));
        for r in &reqs {
            assert_eq!(r.source, PathBuf::from("/opt/app/app.jar"));
            assert_eq!(r.target.ensure, FileEnsure::File);
            assert_eq!(r.target.owner.as_deref(), Some("deploy"));
        }
    }

    #[test]
    fn host_managed_target_is_not_redeclared() {
        let reqs = companion_resources(&spec(Ensure::Absent, None), |p| {
            p == Path::new("/opt/app/app.jar")
        });
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].target.ensure, FileEnsure::Absent);
        assert!(reqs[0].target.owner.is_none());
    }

    #[test]
    fn user_is_autorequired() {
        assert_eq!(required_users(&spec(Ensure::Present, Some("deploy"))), vec!["deploy"]);
        assert!(required_users(&spec(Ensure::Present, None)).is_empty());
    }
}
