//! Error type for comment posting.

use std::io;

use mrc_config::ConfigError;
use mrc_notes::RemoteError;

/// Error from posting a comment.
#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    /// Connection or target could not be resolved. Raised before any remote call.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The code review host rejected or failed a request.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Writing local output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}
