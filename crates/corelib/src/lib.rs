//! Trivy PR Commenter - post Trivy scan findings as pull request review comments
//!
//! This library loads a Trivy JSON report, normalizes its findings to file +
//! line-range locations, and submits each one as a review comment on the
//! current pull request through the GitHub REST API.
//!
//! ## Features
//!
//! - **Schema Tolerance**: Accepts the nested `Results` report and the legacy
//!   flat array form, selected by an explicit shape discriminator
//! - **Line-Anchored Comments**: Misconfiguration occurrences and cause
//!   metadata become review comments on the exact offending lines
//! - **Idempotent**: Comments that already exist on the pull request are
//!   detected and never duplicated
//! - **CI-Friendly Exit Codes**: Batched error reporting and a soft-fail
//!   switch for advisory pipelines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trivy_corelib::{CommentDispatcher, Config, GitHubCommenter, ScanReport};
//!
//! #[tokio::main]
//! async fn main() -> trivy_corelib::Result<()> {
//!     let config = Config::from_env()?;
//!     let pr_number = config.pull_request_number()?;
//!
//!     let report = ScanReport::from_json_file(&config.report_path)?;
//!     let commenter = GitHubCommenter::connect(
//!         &config.github_token,
//!         &config.owner,
//!         &config.repo,
//!         pr_number,
//!         config.timeout_seconds,
//!     )
//!     .await?;
//!
//!     let summary = CommentDispatcher::new(&config, &commenter)?
//!         .dispatch(&report)
//!         .await;
//!     std::process::exit(summary.exit_code(config.soft_fail));
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod github;
pub mod logging;
pub mod trivy;
pub mod types;

pub use config::Config;
pub use dispatcher::{CommentDispatcher, DispatchSummary};
pub use error::{CommenterError, Result};
pub use github::{CommentOutcome, GitHubCommenter, ReviewCommenter};
pub use types::{CommentRequest, Finding, Location, ScanReport, Severity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default Trivy report filename when no argument is given
    pub const DEFAULT_REPORT_FILE: &str = "trivy_results.json";

    /// Public GitHub REST API base URL
    pub const GITHUB_API_BASE: &str = "https://api.github.com";

    /// Default CI event payload path
    pub const DEFAULT_EVENT_PATH: &str = "/github/workflow/event.json";

    /// Default timeout in seconds for API requests
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
}
