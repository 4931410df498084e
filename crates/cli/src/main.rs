use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process;
use tracing::{info, Level};
use trivy_corelib::{
    defaults, logging, CommentDispatcher, CommenterError, Config, GitHubCommenter, ScanReport,
    Severity,
};

fn print_banner() {
    println!();
    println!("{}", "  🛡️  Trivy PR Commenter".bright_blue());
    println!(
        "{}",
        format!(
            "      v{} - Trivy findings as pull request review comments",
            trivy_corelib::VERSION
        )
        .bright_white()
    );
    println!();
}

#[derive(Parser)]
#[command(
    name = "trivy-pr-commenter",
    about = "🛡️ Posts Trivy scan findings as review comments on the current pull request",
    version,
    long_about = "Reads a Trivy JSON report produced earlier in the workflow, maps every finding to a file and line range, and posts each one as a review comment on the pull request that triggered the build.",
    after_help = "💡 Examples:\n  trivy-pr-commenter\n  trivy-pr-commenter trivy_results.json\n  trivy-pr-commenter trivy_results.json -v debug"
)]
struct Cli {
    /// Trivy JSON report file
    #[arg(value_name = "REPORT", help_heading = "INPUT")]
    report: Option<PathBuf>,

    /// Verbosity level for diagnostic logging
    #[arg(short, long, value_name = "LEVEL", help_heading = "LOGGING")]
    verbosity: Option<Level>,
}

fn fail(message: &str) -> ! {
    println!("{}", format!("::error::{}", message).bright_red());
    process::exit(1);
}

async fn build_commenter(
    config: &Config,
    pr_number: u64,
) -> trivy_corelib::Result<GitHubCommenter> {
    if config.api_url.is_empty() || config.api_url == defaults::GITHUB_API_BASE {
        GitHubCommenter::connect(
            &config.github_token,
            &config.owner,
            &config.repo,
            pr_number,
            config.timeout_seconds,
        )
        .await
    } else {
        GitHubCommenter::connect_enterprise(
            &config.api_url,
            &config.github_token,
            &config.owner,
            &config.repo,
            pr_number,
            config.timeout_seconds,
        )
        .await
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(verbosity) = cli.verbosity {
        if verbosity > Level::INFO {
            if let Err(err) = logging::setup_logging(verbosity) {
                eprintln!("failed to configure logging: {}", err);
            }
        }
    }

    print_banner();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => fail(&err.to_string()),
    };
    if let Some(report) = cli.report {
        config.report_path = report;
    }

    println!(
        "{}",
        format!("Working in repository {}", config.repo).bright_white()
    );

    let pr_number = match config.pull_request_number() {
        Ok(number) => number,
        Err(CommenterError::NotAPullRequest) => {
            println!("{}", "Not a PR, nothing to comment on, exiting".bright_yellow());
            return;
        }
        Err(err) => fail(&err.to_string()),
    };
    println!("{}", format!("Working in PR {}", pr_number).bright_white());

    let report = match ScanReport::from_json_file(&config.report_path) {
        Ok(report) => report,
        Err(err) => fail(&format!("failed to load trivy report: {}", err)),
    };
    if report.is_empty() {
        println!("{}", "No findings in trivy report, exiting".bright_green());
        return;
    }
    println!(
        "{}",
        format!(
            "Trivy found {} issues ({} critical, {} high)",
            report.len(),
            report.count_severity(Severity::Critical),
            report.count_severity(Severity::High)
        )
        .bright_white()
    );

    let commenter = match build_commenter(&config, pr_number).await {
        Ok(commenter) => commenter,
        Err(err) => fail(&format!("failed to create commenter: {}", err)),
    };

    let dispatcher = match CommentDispatcher::new(&config, &commenter) {
        Ok(dispatcher) => dispatcher,
        Err(err) => fail(&err.to_string()),
    };

    info!("dispatching {} findings", report.len());
    let summary = dispatcher.dispatch(&report).await;

    if !summary.errors.is_empty() {
        println!(
            "{}",
            format!("There were {} errors:", summary.errors.len()).bright_red()
        );
        for message in &summary.errors {
            println!("{}", message.bright_red());
        }
    } else if summary.comments_written() > 0 {
        println!(
            "{}",
            format!("✅ {} comments written", summary.comments_written()).bright_green()
        );
    }

    process::exit(summary.exit_code(config.soft_fail));
}
