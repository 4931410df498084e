use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::defaults;
use crate::error::CommenterError;

/// Configuration for a commenter run, built once from the CI environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Token for the hosting API (`INPUT_GITHUB_TOKEN`)
    pub github_token: String,

    /// Repository owner, first half of `GITHUB_REPOSITORY`
    pub owner: String,

    /// Repository name, second half of `GITHUB_REPOSITORY`
    pub repo: String,

    /// Hosting API base URL (`GITHUB_API_URL`); a non-default value selects
    /// enterprise client construction
    pub api_url: String,

    /// Workspace root prefix stripped from report paths, with trailing slash
    pub workspace_path: String,

    /// Working-directory prefix prepended to report paths, with trailing slash
    /// (empty when unset)
    pub working_directory: String,

    /// Downgrades "no comments written" from a failure to a success exit code
    pub soft_fail: bool,

    /// Trivy JSON report to load
    pub report_path: PathBuf,

    /// CI event payload consulted when `PR_NUMBER` is not set
    pub event_path: PathBuf,

    /// Timeout in seconds for API requests
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            owner: String::new(),
            repo: String::new(),
            api_url: defaults::GITHUB_API_BASE.to_string(),
            workspace_path: String::new(),
            working_directory: String::new(),
            soft_fail: false,
            report_path: PathBuf::from(defaults::DEFAULT_REPORT_FILE),
            event_path: PathBuf::from(defaults::DEFAULT_EVENT_PATH),
            timeout_seconds: defaults::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Config {
    /// Creates a new configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let github_token = std::env::var("INPUT_GITHUB_TOKEN").unwrap_or_default();
        if github_token.is_empty() {
            return Err(CommenterError::ConfigError(
                "the INPUT_GITHUB_TOKEN has not been set".to_string(),
            ));
        }

        let repository = std::env::var("GITHUB_REPOSITORY").unwrap_or_default();
        let (owner, repo) = match repository.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                (owner.to_string(), repo.to_string())
            }
            _ => {
                return Err(CommenterError::ConfigError(format!(
                    "unexpected value for GITHUB_REPOSITORY. Expected <organisation/name>, found {}",
                    repository
                )))
            }
        };

        let api_url = std::env::var("GITHUB_API_URL")
            .unwrap_or_else(|_| defaults::GITHUB_API_BASE.to_string());

        let workspace_path = match std::env::var("GITHUB_WORKSPACE") {
            Ok(workspace) if !workspace.is_empty() => format!("{}/", workspace),
            _ => String::new(),
        };

        let working_directory =
            normalize_working_dir(&std::env::var("INPUT_WORKING_DIRECTORY").unwrap_or_default());

        let soft_fail = std::env::var("INPUT_SOFT_FAIL_COMMENTER")
            .map(|value| value.to_lowercase() == "true")
            .unwrap_or(false);

        let event_path = PathBuf::from(
            std::env::var("GITHUB_EVENT_PATH")
                .unwrap_or_else(|_| defaults::DEFAULT_EVENT_PATH.to_string()),
        );

        debug!(owner = %owner, repo = %repo, workspace = %workspace_path, "configuration loaded");

        Ok(Config {
            github_token,
            owner,
            repo,
            api_url,
            workspace_path,
            working_directory,
            soft_fail,
            report_path: PathBuf::from(defaults::DEFAULT_REPORT_FILE),
            event_path,
            timeout_seconds: defaults::DEFAULT_TIMEOUT_SECONDS,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.github_token.is_empty() {
            return Err(CommenterError::ConfigError(
                "a GitHub token is required".to_string(),
            ));
        }

        if self.owner.is_empty() || self.repo.is_empty() {
            return Err(CommenterError::ConfigError(
                "a repository in <organisation/name> form is required".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(CommenterError::ConfigError(
                "Timeout seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolves the pull request number under comment.
    ///
    /// `PR_NUMBER` wins when set; otherwise the CI event payload at
    /// `event_path` is read and its top-level `number` field used. Any
    /// failure along the way means the build is not a pull request.
    pub fn pull_request_number(&self) -> crate::Result<u64> {
        if let Ok(raw) = std::env::var("PR_NUMBER") {
            return match raw.trim().parse::<u64>() {
                Ok(number) => Ok(number),
                Err(err) => {
                    debug!("unable to convert PR_NUMBER to integer: {}", err);
                    Err(CommenterError::NotAPullRequest)
                }
            };
        }

        let payload = match std::fs::read_to_string(&self.event_path) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(
                    "event payload not found in {}: {}",
                    self.event_path.display(),
                    err
                );
                return Err(CommenterError::NotAPullRequest);
            }
        };

        let event: serde_json::Value = match serde_json::from_str(&payload) {
            Ok(event) => event,
            Err(err) => {
                debug!("event payload is not valid JSON: {}", err);
                return Err(CommenterError::NotAPullRequest);
            }
        };

        event
            .get("number")
            .and_then(|value| {
                value
                    .as_u64()
                    .or_else(|| value.as_str().and_then(|raw| raw.parse().ok()))
            })
            .ok_or(CommenterError::NotAPullRequest)
    }
}

/// Normalizes the working-directory prefix: strips a leading `./`, strips a
/// trailing `/`, and appends a single `/` when non-empty.
fn normalize_working_dir(raw: &str) -> String {
    let trimmed = raw.trim_start_matches("./").trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}
