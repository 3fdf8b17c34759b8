//! Comment posting command.

use std::io;

use clap::Args;
use console::Term;
use tracing::info;

use mrc_commenter::{CommentSlot, Commenter, DEFAULT_COMMENT_ID, PostOutcome};
use mrc_config::{Connection, ConnectionSettings, EnvSnapshot, TargetSettings};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for posting a comment.
#[derive(Args)]
pub(crate) struct PostArgs {
    /// Name of the managed comment; reruns with the same name update it.
    #[arg(default_value = DEFAULT_COMMENT_ID)]
    comment_id: String,

    /// GitLab project ID (default: $CI_PROJECT_ID).
    #[arg(long)]
    project_id: Option<u64>,

    /// Merge request internal ID (default: $CI_MERGE_REQUEST_IID).
    #[arg(long)]
    mr_iid: Option<u64>,

    /// GitLab access token (default: $GITLAB_MR_PLAN_TOKEN).
    #[arg(long)]
    token: Option<String>,

    /// GitLab API URL (default: $CI_API_V4_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Print the comment to stdout when no API URL is available.
    #[arg(long)]
    local_fallback: bool,
}

impl PostArgs {
    /// Read the comment from stdin and post it.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin is empty, configuration cannot be resolved,
    /// or GitLab rejects a request.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let content = io::read_to_string(io::stdin().lock())?;
        let content = require_content(&content)?;

        let env = EnvSnapshot::from_process();
        let connection = self.connection_settings().resolve(&env)?;
        if connection == Connection::Local {
            info!("No GitLab API URL configured, writing comment to stdout");
        }

        let target = self.target_settings();
        let slot = CommentSlot::new(self.comment_id);
        let mut commenter = Commenter::from_connection(&connection, env, Term::stdout());
        let outcome = commenter.post(content, &target, &slot)?;
        print_outcome(output, &slot, outcome);
        Ok(())
    }

    fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            token: self.token.clone(),
            api_url: self.api_url.clone(),
            local_fallback: self.local_fallback,
        }
    }

    fn target_settings(&self) -> TargetSettings {
        TargetSettings {
            project_id: self.project_id,
            mr_iid: self.mr_iid,
        }
    }
}

/// Reject input with nothing to post.
fn require_content(content: &str) -> Result<&str, CliError> {
    if content.trim().is_empty() {
        return Err(CliError::Validation(
            "stdin is empty, nothing to post".to_owned(),
        ));
    }
    Ok(content)
}

fn print_outcome(output: &Output, slot: &CommentSlot, outcome: PostOutcome) {
    match outcome {
        PostOutcome::Created { note_id } => {
            output.success(&format!("Created note {note_id} for comment '{slot}'"));
        }
        PostOutcome::Updated { note_id } => {
            output.success(&format!("Updated note {note_id} for comment '{slot}'"));
        }
        PostOutcome::Printed => {}
    }
}
