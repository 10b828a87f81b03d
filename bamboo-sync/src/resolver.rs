//! Latest-build resolution against the Bamboo REST API.
//!
//! `GET {server}/rest/api/latest/result/{plan}/latest/` returns a document
//! shaped like:
//!
//! ```text
//! <result number="42" key="APP-REL-42" state="Successful">
//!   <buildState>Successful</buildState>
//!   ...
//! </result>
//! ```
//!
//! Only `buildState` and the `number` attribute are read.

use std::io::Read;

use serde::Deserialize;

use bamboo_core::{PlanKey, ServerUrl};

use crate::error::SyncError;
use crate::http::HttpClient;

/// The literal marker the server uses for a green build.
pub const SUCCESSFUL_STATE: &str = "Successful";

/// Outcome of a latest-build query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestBuild {
    /// The latest build succeeded and may be installed.
    Successful(u64),
    /// The latest build exists but did not succeed; nothing is actionable.
    Skip { number: u64, state: String },
}

impl LatestBuild {
    /// The installable build number, if any.
    pub fn number(&self) -> Option<u64> {
        match self {
            LatestBuild::Successful(n) => Some(*n),
            LatestBuild::Skip { .. } => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, LatestBuild::Skip { .. })
    }
}

#[derive(Debug, Deserialize)]
struct BuildResultDoc {
    #[serde(rename = "@number")]
    number: u64,
    #[serde(rename = "buildState", default)]
    build_state: String,
}

/// `{server}/rest/api/latest/result/{plan}/latest/`
pub fn latest_result_url(server: &ServerUrl, plan: &PlanKey) -> String {
    server.endpoint(&format!("rest/api/latest/result/{plan}/latest/"))
}

/// Parse a build-result document into a [`LatestBuild`].
pub fn parse_build_result(url: &str, body: &str) -> Result<LatestBuild, SyncError> {
    let doc: BuildResultDoc =
        quick_xml::de::from_str(body).map_err(|e| SyncError::InvalidResponse {
            url: url.to_string(),
            source: e,
        })?;
    if doc.build_state.trim() != SUCCESSFUL_STATE {
        tracing::warn!(
            "state of build {} is {}, not updating",
            doc.number,
            doc.build_state
        );
        return Ok(LatestBuild::Skip {
            number: doc.number,
            state: doc.build_state,
        });
    }
    Ok(LatestBuild::Successful(doc.number))
}

/// Memoizing resolver for one evaluation cycle.
///
/// The first call to [`BuildResolver::latest`] performs the network request;
/// later calls return the cached outcome. Errors are not cached.
#[derive(Debug)]
pub struct BuildResolver {
    server: ServerUrl,
    plan: PlanKey,
    cached: Option<LatestBuild>,
}

impl BuildResolver {
    pub fn new(server: ServerUrl, plan: PlanKey) -> Self {
        Self {
            server,
            plan,
            cached: None,
        }
    }

    /// The cached outcome, without touching the network.
    pub fn cached(&self) -> Option<&LatestBuild> {
        self.cached.as_ref()
    }

    pub fn latest<C: HttpClient + ?Sized>(&mut self, client: &C) -> Result<LatestBuild, SyncError> {
        if let Some(hit) = &self.cached {
            return Ok(hit.clone());
        }
        let resolved = resolve_latest(client, &self.server, &self.plan)?;
        self.cached = Some(resolved.clone());
        Ok(resolved)
    }
}

/// Query the server once for the latest build of `plan`. No caching.
pub fn resolve_latest<C: HttpClient + ?Sized>(
    client: &C,
    server: &ServerUrl,
    plan: &PlanKey,
) -> Result<LatestBuild, SyncError> {
    let url = latest_result_url(server, plan);
    let response = client.get(&url)?;
    if !response.is_success() {
        return Err(response.into_remote_error(&url));
    }

    let mut body = String::new();
    let mut reader = response.body;
    reader
        .read_to_string(&mut body)
        .map_err(|e| SyncError::Transport {
            url: url.clone(),
            source: Box::new(e),
        })?;

    let latest = parse_build_result(&url, &body)?;
    if let LatestBuild::Successful(n) = latest {
        tracing::info!("checked {url} for latest build, got {n}");
    }
    Ok(latest)
}
