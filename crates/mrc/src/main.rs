//! gitlab-mr-commenter - post or update a merge request comment from CI.
//!
//! Reads the comment content from stdin and upserts it into the comment
//! owned by `COMMENT_ID` on the target merge request.

mod error;
mod output;
mod post;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use output::Output;
use post::PostArgs;

/// Environment variables, listed in `--help`.
const ENV_HELP: &str = "\
Environment variables:
  GITLAB_MR_PLAN_TOKEN   GitLab access token
  GITLAB_TOKEN           GitLab access token (deprecated, use GITLAB_MR_PLAN_TOKEN)
  CI_API_V4_URL          GitLab API URL, e.g. https://gitlab.com/api/v4
  CI_PROJECT_ID          Project ID of the merge request
  CI_MERGE_REQUEST_IID   Internal ID of the merge request
  RUST_LOG               Log filter (default: warn)";

/// Post or update a GitLab merge request comment identified by a hidden marker.
#[derive(Parser)]
#[command(name = "gitlab-mr-commenter", version, about, after_long_help = ENV_HELP)]
struct Cli {
    #[command(flatten)]
    post: PostArgs,

    /// Enable verbose output (info-level logging).
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.post.execute(&output) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
