//! GitHub pull request descriptions as documents
//!
//! Reads with `GET /repos/{owner}/{repo}/pulls/{number}` and writes with
//! `PATCH` on the same URL. The response `ETag` is kept as the version. When
//! conditional writes are enabled it is sent back as `If-Match`.

use crate::{DocumentStore, ResourceId, Result, Snapshot, StoreError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ETAG, IF_MATCH};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// A pull request address, written `owner/repo#number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.to_string())
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl FromStr for PullRequestRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| StoreError::InvalidResource {
            resource: s.to_string(),
            reason: reason.to_string(),
        };

        let (slug, number) = s
            .split_once('#')
            .ok_or_else(|| invalid("expected owner/repo#number"))?;
        let (owner, repo) = slug
            .split_once('/')
            .ok_or_else(|| invalid("expected owner/repo#number"))?;

        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid("expected owner/repo#number"));
        }

        let number = number
            .parse::<u64>()
            .map_err(|_| invalid("pull request number is not a positive integer"))?;
        if number == 0 {
            return Err(invalid("pull request number is not a positive integer"));
        }

        Ok(Self::new(owner, repo, number))
    }
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdatePullRequest<'a> {
    body: &'a str,
}

/// Store for pull request descriptions on GitHub or GitHub Enterprise.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: Client,
    api_url: String,
    token: String,
    conditional_writes: bool,
}

impl GitHubStore {
    /// Create a store talking to `api_url` with a bearer `token`.
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!("prmd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Rejected {
                resource: api_url.clone(),
                status: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_url,
            token: token.into(),
            conditional_writes: false,
        })
    }

    /// Send the fetched `ETag` as `If-Match` on writes.
    ///
    /// Off by default. The pulls endpoint does not document conditional
    /// updates and returns weak `W/"..."` tags, which never satisfy a strong
    /// `If-Match` comparison.
    pub fn with_conditional_writes(mut self, enabled: bool) -> Self {
        self.conditional_writes = enabled;
        self
    }

    fn pull_url(&self, pr: &PullRequestRef) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, pr.owner, pr.repo, pr.number
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

#[async_trait]
impl DocumentStore for GitHubStore {
    async fn fetch(&self, resource: &ResourceId) -> Result<Snapshot> {
        let pr: PullRequestRef = resource.as_str().parse()?;
        tracing::debug!(%pr, "Fetching pull request");

        let response = self
            .authorized(self.client.get(self.pull_url(&pr)))
            .send()
            .await
            .map_err(|e| StoreError::transient(resource.as_str(), e.to_string()))?;
        let response = check_status(resource, response).await?;

        let version = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let payload: PullRequest = response
            .json()
            .await
            .map_err(|e| StoreError::transient(resource.as_str(), e.to_string()))?;

        Ok(Snapshot::new(payload.body.unwrap_or_default(), version))
    }

    async fn write(
        &self,
        resource: &ResourceId,
        body: &str,
        expected_version: Option<&str>,
    ) -> Result<()> {
        let pr: PullRequestRef = resource.as_str().parse()?;
        tracing::debug!(%pr, "Updating pull request body");

        let mut request = self
            .authorized(self.client.patch(self.pull_url(&pr)))
            .json(&UpdatePullRequest { body });
        if self.conditional_writes {
            if let Some(version) = expected_version {
                request = request.header(IF_MATCH, version);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::transient(resource.as_str(), e.to_string()))?;
        check_status(resource, response).await?;

        Ok(())
    }
}

/// Pass successful responses through, map the rest onto [`StoreError`].
async fn check_status(resource: &ResourceId, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(classify_status(resource, status, message))
}

fn classify_status(resource: &ResourceId, status: StatusCode, message: String) -> StoreError {
    let resource = resource.to_string();
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound { resource },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Forbidden { resource, message }
        }
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => StoreError::Conflict { resource },
        StatusCode::TOO_MANY_REQUESTS => StoreError::Transient { resource, message },
        s if s.is_server_error() => StoreError::Transient { resource, message },
        s => StoreError::Rejected {
            resource,
            status: s.as_u16(),
            message,
        },
    }
}
