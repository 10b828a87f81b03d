//! Single-resource evaluation pipeline used by the CLI host.
//!
//! Mirrors how a declarative engine drives a provider:
//! 1. Compare `ensure` with whether the target exists.
//! 2. If the target exists and should, check every property in declaration
//!    order and call the (no-op) setter for each one out of sync.
//! 3. If anything changed, `flush`.

use std::path::{Path, PathBuf};

use bamboo_core::{ArtifactSpec, Ensure};

use crate::companion::Relationship;
use crate::error::SyncError;
use crate::http::HttpClient;
use crate::property::{Property, PropertyValue};
use crate::provider::ArtifactProvider;

/// A detected divergence between current and desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Ensure {
        from: Ensure,
        to: Ensure,
    },
    Property {
        property: Property,
        is: Option<PropertyValue>,
        should: PropertyValue,
    },
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Ensure { from, to } => write!(f, "ensure changed '{from}' to '{to}'"),
            Change::Property { property, is, should } => match is {
                Some(is) => write!(f, "{property} changed '{is}' to '{should}'"),
                None => write!(f, "{property} defined as '{should}'"),
            },
        }
    }
}

/// What the evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Present and every property in sync.
    InSync,
    /// A new build was downloaded and installed.
    Installed { build: u64 },
    /// Noop mode: changes were detected but not applied.
    WouldChange,
    /// Should be absent and was present; removal is up to the companion files.
    Removed,
    /// Should be absent and already is.
    Absent,
}

/// Result of evaluating one artifact resource.
#[derive(Debug)]
pub struct Evaluation {
    pub path: PathBuf,
    pub outcome: Outcome,
    pub changes: Vec<Change>,
    pub relationships: Vec<Relationship>,
}

/// Evaluate `spec` once. In `noop` mode no setter, `create`, `destroy` or
/// `flush` is called, but the resolver may still be queried.
pub fn evaluate<C: HttpClient + ?Sized>(
    spec: &ArtifactSpec,
    client: &C,
    noop: bool,
    host_manages: impl Fn(&Path) -> bool,
) -> Result<Evaluation, SyncError> {
    spec.validate()?;

    let mut provider = ArtifactProvider::new(spec, client);
    let relationships = provider.companion_resources(host_manages);
    let current = if provider.exists() {
        Ensure::Present
    } else {
        Ensure::Absent
    };

    let mut changes = Vec::new();
    match (spec.ensure, current) {
        (Ensure::Present, Ensure::Absent) => {
            changes.push(Change::Ensure {
                from: current,
                to: spec.ensure,
            });
            if !noop {
                provider.create();
            }
        }
        (Ensure::Present, Ensure::Present) => {
            for property in Property::ALL {
                if provider.insync(property)? {
                    continue;
                }
                let should = property.should(spec);
                if !noop {
                    provider.set_property(property, &should);
                }
                changes.push(Change::Property {
                    property,
                    is: provider.property(property),
                    should,
                });
            }
        }
        (Ensure::Absent, Ensure::Present) => {
            changes.push(Change::Ensure {
                from: current,
                to: spec.ensure,
            });
            if !noop {
                provider.destroy();
            }
        }
        (Ensure::Absent, Ensure::Absent) => {}
    }

    let outcome = if changes.is_empty() {
        match spec.ensure {
            Ensure::Present => Outcome::InSync,
            Ensure::Absent => Outcome::Absent,
        }
    } else if noop {
        Outcome::WouldChange
    } else {
        match provider.flush()? {
            Some(installed) => Outcome::Installed {
                build: installed.build,
            },
            None => Outcome::Removed,
        }
    };

    for change in &changes {
        tracing::info!("{}: {change}", spec.path.display());
    }

    Ok(Evaluation {
        path: spec.path.clone(),
        outcome,
        changes,
        relationships,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeClient;
    use crate::meta_store::{self, LocalMetadata};
    use bamboo_core::{BuildSelector, PlanKey, ServerUrl};
    use std::fs;
    use tempfile::TempDir;

    const STATUS: &str = "http://ci/rest/api/latest/result/REL/latest/";
    const DOWNLOAD_42: &str = "http://ci/browse/REL-42/artifact/app.jar";

    fn status_doc(number: u64, state: &str) -> String {
        format!(r#"<result number="{number}"><buildState>{state}</buildState></result>"#)
    }

    fn spec_at(dir: &Path, build: BuildSelector) -> ArtifactSpec {
        ArtifactSpec {
            ensure: Ensure::Present,
            path: dir.join("app.jar"),
            server: ServerUrl::from("http://ci"),
            plan: PlanKey::from("REL"),
            build,
            artifact_path: "app.jar".to_string(),
            user: None,
        }
    }

    #[test]
    fn first_run_installs_then_second_run_is_in_sync() {
        let _ = env_logger::builder().is_test(true).try_init();
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path(), BuildSelector::Latest);
        let client = FakeClient::new()
            .reply(STATUS, 200, status_doc(42, "Successful"))
            .reply(DOWNLOAD_42, 200, b"build 42".to_vec());

        let first = evaluate(&spec, &client, false, |_| false).unwrap();
        assert_eq!(first.outcome, Outcome::Installed { build: 42 });
        assert_eq!(
            first.changes,
            vec![Change::Ensure {
                from: Ensure::Absent,
                to: Ensure::Present
            }]
        );
        assert_eq!(first.relationships.len(), 2);

        let second = evaluate(&spec, &client, false, |_| false).unwrap();
        assert_eq!(second.outcome, Outcome::InSync);
        assert!(second.changes.is_empty());

        assert_eq!(client.count(DOWNLOAD_42), 1);
        assert_eq!(client.count(STATUS), 2);
    }

    #[test]
    fn newer_latest_build_is_reported_and_installed() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path(), BuildSelector::Latest);
        fs::write(&spec.path, b"build 40").unwrap();
        meta_store::save(&spec.path, &LocalMetadata::from_spec(&spec, 40)).unwrap();
        let client = FakeClient::new()
            .reply(STATUS, 200, status_doc(42, "Successful"))
            .reply(DOWNLOAD_42, 200, b"build 42".to_vec());

        let eval = evaluate(&spec, &client, false, |_| false).unwrap();
        assert_eq!(eval.outcome, Outcome::Installed { build: 42 });
        assert_eq!(eval.changes.len(), 1);
        assert_eq!(
            eval.changes[0].to_string(),
            "build changed '40' to 'latest'"
        );
        assert_eq!(fs::read(&spec.path).unwrap(), b"build 42");
    }

    #[test]
    fn noop_reports_without_downloading() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path(), BuildSelector::Number(42));
        let client = FakeClient::new().reply(DOWNLOAD_42, 200, b"build 42".to_vec());

        let eval = evaluate(&spec, &client, true, |_| false).unwrap();
        assert_eq!(eval.outcome, Outcome::WouldChange);
        assert_eq!(client.total(), 0);
        assert!(!spec.path.exists());
    }

    #[test]
    fn failed_latest_on_synced_target_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path(), BuildSelector::Latest);
        fs::write(&spec.path, b"build 40").unwrap();
        meta_store::save(&spec.path, &LocalMetadata::from_spec(&spec, 40)).unwrap();
        let client = FakeClient::new().reply(STATUS, 200, status_doc(43, "Failed"));

        let eval = evaluate(&spec, &client, false, |_| false).unwrap();
        assert_eq!(eval.outcome, Outcome::InSync);
        assert_eq!(fs::read(&spec.path).unwrap(), b"build 40");
    }

    #[test]
    fn failed_latest_on_first_run_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path(), BuildSelector::Latest);
        let client = FakeClient::new().reply(STATUS, 200, status_doc(43, "Failed"));

        let err = evaluate(&spec, &client, false, |_| false).unwrap_err();
        assert!(matches!(err, SyncError::BuildNotSuccessful { .. }), "got: {err}");
        assert_eq!(client.total(), 1);
        assert!(!spec.temp_file().exists());
    }

    #[test]
    fn resolver_failure_aborts_evaluation() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path(), BuildSelector::Latest);
        fs::write(&spec.path, b"build 40").unwrap();
        meta_store::save(&spec.path, &LocalMetadata::from_spec(&spec, 40)).unwrap();
        let client = FakeClient::new().unreachable(STATUS);

        let err = evaluate(&spec, &client, false, |_| false).unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }), "got: {err}");
    }

    #[test]
    fn absent_target_that_exists_is_delegated() {
        let tmp = TempDir::new().unwrap();
        let mut spec = spec_at(tmp.path(), BuildSelector::Latest);
        spec.ensure = Ensure::Absent;
        fs::write(&spec.path, b"stale").unwrap();
        let client = FakeClient::new();

        let eval = evaluate(&spec, &client, false, |_| false).unwrap();
        assert_eq!(eval.outcome, Outcome::Removed);
        assert_eq!(client.total(), 0);
        // The provider itself never deletes the target.
        assert!(spec.path.exists());

        fs::remove_file(&spec.path).unwrap();
        let again = evaluate(&spec, &client, false, |_| false).unwrap();
        assert_eq!(again.outcome, Outcome::Absent);
    }

    #[test]
    fn invalid_spec_is_rejected_before_any_request() {
        let mut spec = spec_at(Path::new("/tmp"), BuildSelector::Latest);
        spec.path = PathBuf::from("relative.jar");
        let client = FakeClient::new();
        let err = evaluate(&spec, &client, false, |_| false).unwrap_err();
        assert!(matches!(err, SyncError::Spec(_)), "got: {err}");
        assert_eq!(client.total(), 0);
    }
}
