//! Error types for GitLab integration.

use mrc_notes::{RemoteError, RemoteErrorKind};

/// Backend identifier attached to converted errors.
pub(crate) const BACKEND: &str = "GitLab";

/// Error from GitLab API operations.
#[derive(Debug, thiserror::Error)]
pub enum GitLabError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("HTTP error: {status} - {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GitLabError {
    /// Semantic category of this error.
    #[must_use]
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            Self::HttpRequest(ureq::Error::Timeout(_)) => RemoteErrorKind::Timeout,
            Self::HttpRequest(_) => RemoteErrorKind::Unavailable,
            Self::HttpResponse { status, .. } => RemoteErrorKind::from_status(*status),
            Self::Json(_) => RemoteErrorKind::InvalidResponse,
        }
    }

    /// Convert into a [`RemoteError`] annotated with the resource being accessed.
    #[must_use]
    pub(crate) fn into_remote(self, resource: impl Into<String>) -> RemoteError {
        RemoteError::from(self).with_resource(resource)
    }
}

impl From<GitLabError> for RemoteError {
    fn from(err: GitLabError) -> Self {
        let remote = match &err {
            GitLabError::HttpResponse { status, .. } => RemoteError::from_status(*status),
            other => RemoteError::new(other.kind()),
        };
        remote.with_backend(BACKEND).with_source(err)
    }
}
