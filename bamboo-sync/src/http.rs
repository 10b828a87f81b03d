//! Blocking HTTP seam used by the resolver and the installer.
//!
//! Non-2xx statuses come back as ordinary [`HttpResponse`] values so callers
//! decide how to report them; only failures that never produced a response
//! become [`SyncError::Transport`].

use std::io::Read;
use std::time::Duration;

use crate::error::SyncError;

/// Fixed connect timeout for every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Fixed read timeout for every request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// A response whose body has not been consumed yet.
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Box<dyn Read + Send + Sync + 'static>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `SyncError::Remote` describing this response.
    pub fn into_remote_error(self, url: &str) -> SyncError {
        SyncError::Remote {
            url: url.to_string(),
            status: self.status,
            status_text: self.status_text,
        }
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

/// Issues a single GET. Implementations never retry.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse, SyncError>;
}

/// Production client backed by a `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        Self { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str) -> Result<HttpResponse, SyncError> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(SyncError::Transport {
                    url: url.to_string(),
                    source: Box::new(transport),
                })
            }
        };
        Ok(HttpResponse {
            status: response.status(),
            status_text: response.status_text().to_string(),
            body: response.into_reader(),
        })
    }
}
