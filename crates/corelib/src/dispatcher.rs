use colored::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::github::{CommentOutcome, ReviewCommenter};
use crate::types::{CommentRequest, Finding, ScanReport};

/// Walks a scan report and forwards every commentable finding to the
/// review-comment client
pub struct CommentDispatcher<'a, C: ReviewCommenter> {
    config: &'a Config,
    client: &'a C,
}

/// Tally of one dispatch pass
#[derive(Debug, Default)]
pub struct DispatchSummary {
    /// Comments created on the pull request
    pub written: usize,
    /// Comments that already existed (idempotent no-op, counts as written)
    pub already_written: usize,
    /// Locations outside the reviewable diff, silently skipped
    pub not_in_diff: usize,
    /// Findings with no line anchor, never submitted
    pub without_location: usize,
    /// Unrecoverable per-finding errors, batched for the end of the run
    pub errors: Vec<String>,
}

impl DispatchSummary {
    /// Comments considered written, including idempotent no-ops
    pub fn comments_written(&self) -> usize {
        self.written + self.already_written
    }

    /// Process exit code for this summary.
    ///
    /// Any unrecoverable error fails the run. A run that wrote nothing and
    /// hit no errors also fails, unless soft-fail downgrades it.
    pub fn exit_code(&self, soft_fail: bool) -> i32 {
        if !self.errors.is_empty() {
            return 1;
        }
        if self.comments_written() == 0 {
            if soft_fail {
                0
            } else {
                1
            }
        } else {
            0
        }
    }
}

impl<'a, C: ReviewCommenter> CommentDispatcher<'a, C> {
    /// Creates a new dispatcher over a validated configuration
    pub fn new(config: &'a Config, client: &'a C) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    /// Dispatches every finding/location pair sequentially, accumulating
    /// errors instead of failing fast
    pub async fn dispatch(&self, report: &ScanReport) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for finding in &report.findings {
            if finding.locations.is_empty() {
                println!(
                    "{}",
                    format!(
                        "{} / {} - no commentable location; skipping",
                        finding.id, finding.severity
                    )
                    .bright_black()
                );
                summary.without_location += 1;
                continue;
            }

            for location in &finding.locations {
                let path = normalize_path(
                    &location.path,
                    &self.config.workspace_path,
                    &self.config.working_directory,
                );
                println!(
                    "{}",
                    format!(
                        "Preparing comment for violation of rule {} in {} (lines {} to {})",
                        finding.id, path, location.start_line, location.end_line
                    )
                    .bright_white()
                );

                let request = CommentRequest {
                    path,
                    body: render_comment(finding),
                    start_line: location.start_line,
                    end_line: location.end_line,
                };

                match self.client.post_comment(&request).await {
                    Ok(CommentOutcome::Written) => {
                        summary.written += 1;
                        println!(
                            "{}",
                            format!(
                                "  Comment written for violation of rule {} in {}",
                                finding.id, request.path
                            )
                            .bright_green()
                        );
                    }
                    Ok(CommentOutcome::AlreadyWritten) => {
                        summary.already_written += 1;
                        println!("{}", "  Ignoring - comment already written".bright_yellow());
                    }
                    Ok(CommentOutcome::NotInDiff) => {
                        summary.not_in_diff += 1;
                        debug!(path = %request.path, "line range outside the reviewable diff");
                        println!(
                            "{}",
                            "  Ignoring - change not part of the current PR".bright_yellow()
                        );
                    }
                    Err(err) => {
                        println!(
                            "{}",
                            format!("  Failed to write comment: {}", err).bright_red()
                        );
                        summary.errors.push(err.to_string());
                    }
                }
            }
        }

        info!(
            written = summary.written,
            already_written = summary.already_written,
            not_in_diff = summary.not_in_diff,
            without_location = summary.without_location,
            errors = summary.errors.len(),
            "dispatch finished"
        );
        summary
    }
}

/// Normalizes a scanner-reported path so it matches the pull request's diff
/// paths exactly: strips the workspace-root prefix and any `./`, then
/// prepends the working-directory prefix. Idempotent.
pub fn normalize_path(target: &str, workspace_path: &str, working_directory: &str) -> String {
    let mut path = target.to_string();
    if !workspace_path.is_empty() {
        path = path.replace(workspace_path, "");
    }
    let path = path.trim_start_matches("./");
    if working_directory.is_empty() || path.starts_with(working_directory) {
        path.to_string()
    } else {
        format!("{}{}", working_directory, path)
    }
}

/// Renders the review-comment body for a finding
pub fn render_comment(finding: &Finding) -> String {
    format!(
        ":warning: trivy found a **{}** severity issue from rule `{}`:\n> {}\n\nMore information available {}",
        finding.severity,
        finding.id,
        finding.description,
        format_reference_links(finding)
    )
}

/// Every reference URL as a markdown link labeled `here`, joined with `and`;
/// the primary URL stands in when the reference list is empty
fn format_reference_links(finding: &Finding) -> String {
    let urls: Vec<&String> = if finding.references.is_empty() {
        finding.primary_url.iter().collect()
    } else {
        finding.references.iter().collect()
    };
    urls.iter()
        .map(|url| format!("[here]({})", url))
        .collect::<Vec<_>>()
        .join(" and ")
}
