//! GitHub webhook event payloads
//!
//! Only the fields needed to locate the pull request are read. The body in
//! the payload is the description as it was when the event fired; it serves
//! as fallback when the API cannot be reached.

use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub action: Option<String>,
    pub pull_request: Option<PullRequestEvent>,
    pub repository: Option<RepositoryEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub number: u64,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEvent {
    pub full_name: String,
}

impl EventPayload {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Read {
            what: "event payload",
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CliError::EventParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Description at event time; a pull request without one counts as empty.
    pub fn cached_body(&self) -> Option<String> {
        self.pull_request
            .as_ref()
            .map(|pr| pr.body.clone().unwrap_or_default())
    }
}
