//! Review-comment client: the `ReviewCommenter` seam the dispatcher talks
//! to, and the production `GitHubCommenter` over the GitHub REST API.
//!
//! Comments are addressed by line number through the modern pull-request
//! review-comment endpoint, so no diff-position arithmetic happens here. The
//! hosting API decides whether a line range is reviewable; a 422 response is
//! the "not part of the diff" signal.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::error::CommenterError;
use crate::types::CommentRequest;

const USER_AGENT: &str = "trivy-pr-commenter";
const PAGE_SIZE: usize = 100;

/// Outcome of a single review-comment submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    /// The comment was created on the pull request
    Written,
    /// An identical comment already exists; nothing was posted
    AlreadyWritten,
    /// The line range is not part of the reviewable diff; nothing was posted
    NotInDiff,
}

/// Submits review comments anchored to a file and line range
#[async_trait]
pub trait ReviewCommenter {
    async fn post_comment(&self, request: &CommentRequest) -> crate::Result<CommentOutcome>;
}

/// An existing review comment, kept for duplicate detection
#[derive(Debug, Clone, Deserialize)]
pub struct ExistingComment {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    head: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

/// Production client for posting review comments on a GitHub pull request
pub struct GitHubCommenter {
    client: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
    pr_number: u64,
    api_base: String,
    head_sha: String,
    existing: Vec<ExistingComment>,
}

impl GitHubCommenter {
    /// Connects against the public GitHub API
    pub async fn connect(
        token: &str,
        owner: &str,
        repo: &str,
        pr_number: u64,
        timeout_seconds: u64,
    ) -> crate::Result<Self> {
        Self::connect_to(
            crate::defaults::GITHUB_API_BASE,
            token,
            owner,
            repo,
            pr_number,
            timeout_seconds,
        )
        .await
    }

    /// Connects against a GitHub Enterprise host, rebuilding the REST base
    /// URL from the configured API URL's scheme and host
    pub async fn connect_enterprise(
        api_url: &str,
        token: &str,
        owner: &str,
        repo: &str,
        pr_number: u64,
        timeout_seconds: u64,
    ) -> crate::Result<Self> {
        let api_base = enterprise_base_url(api_url)?;
        Self::connect_to(&api_base, token, owner, repo, pr_number, timeout_seconds).await
    }

    async fn connect_to(
        api_base: &str,
        token: &str,
        owner: &str,
        repo: &str,
        pr_number: u64,
        timeout_seconds: u64,
    ) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        let mut commenter = Self {
            client,
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            pr_number,
            api_base: api_base.trim_end_matches('/').to_string(),
            head_sha: String::new(),
            existing: Vec::new(),
        };

        commenter.head_sha = commenter.fetch_head_sha().await?;
        commenter.existing = commenter.fetch_existing_comments().await?;
        info!(
            pr = pr_number,
            existing = commenter.existing.len(),
            "connected to pull request"
        );

        Ok(commenter)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.v3+json")
    }

    async fn fetch_head_sha(&self) -> crate::Result<String> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base, self.owner, self.repo, self.pr_number
        );
        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CommenterError::ApiError(format!(
                "could not load pull request {}: HTTP {}",
                self.pr_number,
                response.status()
            )));
        }
        let pull: PullRequest = response.json().await?;
        Ok(pull.head.sha)
    }

    /// Fetches every existing review comment on the pull request, one page
    /// at a time
    async fn fetch_existing_comments(&self) -> crate::Result<Vec<ExistingComment>> {
        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/comments?per_page={}&page={}",
                self.api_base, self.owner, self.repo, self.pr_number, PAGE_SIZE, page
            );
            let response = self.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(CommenterError::ApiError(format!(
                    "could not list review comments: HTTP {}",
                    response.status()
                )));
            }
            let batch: Vec<ExistingComment> = response.json().await?;
            let done = batch.len() < PAGE_SIZE;
            comments.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        Ok(comments)
    }
}

#[async_trait]
impl ReviewCommenter for GitHubCommenter {
    async fn post_comment(&self, request: &CommentRequest) -> crate::Result<CommentOutcome> {
        if is_duplicate(&self.existing, request) {
            return Ok(CommentOutcome::AlreadyWritten);
        }

        let url = format!(
            "{}/repos/{}/{}/pulls/{}/comments",
            self.api_base, self.owner, self.repo, self.pr_number
        );
        let payload = comment_payload(&self.head_sha, request);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(CommentOutcome::Written);
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            debug!(path = %request.path, "comment rejected as outside the diff: {}", body);
            return Ok(CommentOutcome::NotInDiff);
        }

        Err(CommenterError::ApiError(format!(
            "HTTP {} posting comment for {}: {}",
            status, request.path, body
        )))
    }
}

/// Rebuilds `scheme://host/api/v3` from a configured enterprise API URL
fn enterprise_base_url(api_url: &str) -> crate::Result<String> {
    let url = reqwest::Url::parse(api_url).map_err(|err| {
        CommenterError::ConfigError(format!("invalid GITHUB_API_URL {}: {}", api_url, err))
    })?;
    let host = url.host_str().ok_or_else(|| {
        CommenterError::ConfigError(format!("GITHUB_API_URL {} has no host", api_url))
    })?;
    Ok(format!("{}://{}/api/v3", url.scheme(), host))
}

fn is_duplicate(existing: &[ExistingComment], request: &CommentRequest) -> bool {
    existing
        .iter()
        .any(|comment| comment.path == request.path && comment.body == request.body)
}

/// Builds the create-comment payload; multi-line ranges carry an explicit
/// start line, single lines must not
fn comment_payload(commit_id: &str, request: &CommentRequest) -> serde_json::Value {
    let mut payload = json!({
        "body": request.body,
        "commit_id": commit_id,
        "path": request.path,
        "side": "RIGHT",
        "line": request.end_line,
    });
    if request.start_line < request.end_line {
        payload["start_line"] = json!(request.start_line);
        payload["start_side"] = json!("RIGHT");
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, start_line: u32, end_line: u32) -> CommentRequest {
        CommentRequest {
            path: path.to_string(),
            body: "body".to_string(),
            start_line,
            end_line,
        }
    }

    #[test]
    fn test_comment_payload_multi_line() {
        let payload = comment_payload("abc123", &request("main.tf", 14, 22));
        assert_eq!(payload["commit_id"], "abc123");
        assert_eq!(payload["path"], "main.tf");
        assert_eq!(payload["line"], 22);
        assert_eq!(payload["start_line"], 14);
        assert_eq!(payload["start_side"], "RIGHT");
    }

    #[test]
    fn test_comment_payload_single_line() {
        let payload = comment_payload("abc123", &request("main.tf", 7, 7));
        assert_eq!(payload["line"], 7);
        assert!(payload.get("start_line").is_none());
    }

    #[test]
    fn test_is_duplicate() {
        let existing = vec![ExistingComment {
            path: "main.tf".to_string(),
            body: "body".to_string(),
        }];
        assert!(is_duplicate(&existing, &request("main.tf", 1, 1)));
        assert!(!is_duplicate(&existing, &request("other.tf", 1, 1)));

        let mut other_body = request("main.tf", 1, 1);
        other_body.body = "different".to_string();
        assert!(!is_duplicate(&existing, &other_body));
    }

    #[test]
    fn test_enterprise_base_url() {
        assert_eq!(
            enterprise_base_url("https://github.example.com/api/v3").unwrap(),
            "https://github.example.com/api/v3"
        );
        assert_eq!(
            enterprise_base_url("http://github.internal").unwrap(),
            "http://github.internal/api/v3"
        );
        assert!(enterprise_base_url("not a url").is_err());
    }
}
