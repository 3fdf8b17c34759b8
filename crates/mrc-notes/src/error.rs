//! Remote error type.

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemoteErrorKind {
    /// Project, merge request or note does not exist (or is hidden from the token).
    NotFound,
    /// Token missing, expired or revoked.
    Unauthorized,
    /// Token lacks the required scope or role.
    PermissionDenied,
    /// Too many requests.
    RateLimited,
    /// Host unreachable or returned a server error.
    Unavailable,
    /// Request timed out.
    Timeout,
    /// Response could not be decoded.
    InvalidResponse,
    /// Other/unknown error category.
    Other,
}

impl RemoteErrorKind {
    /// Category for an HTTP error status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable,
            _ => Self::Other,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::Unauthorized => "Unauthorized",
            Self::PermissionDenied => "Permission denied",
            Self::RateLimited => "Rate limited",
            Self::Unavailable => "Unavailable",
            Self::Timeout => "Timeout",
            Self::InvalidResponse => "Invalid response",
            Self::Other => "Error",
        }
    }
}

/// Error returned by a [`MergeRequestApi`](crate::MergeRequestApi) call.
///
/// Carries a semantic kind, the HTTP status when there was one, the resource
/// being accessed, and the backend-specific source error.
#[derive(Debug)]
pub struct RemoteError {
    /// Semantic error category.
    pub kind: RemoteErrorKind,
    /// HTTP status code (if the host answered).
    pub status: Option<u16>,
    /// Resource context (e.g., "project 123 !45").
    pub resource: Option<String>,
    /// Backend identifier (e.g., "GitLab", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RemoteError {
    /// Create a new remote error.
    #[must_use]
    pub fn new(kind: RemoteErrorKind) -> Self {
        Self {
            kind,
            status: None,
            resource: None,
            backend: None,
            source: None,
        }
    }

    /// Create an error from an HTTP error status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        let mut error = Self::new(RemoteErrorKind::from_status(status));
        error.status = Some(status);
        error
    }

    /// Create a not found error for a resource.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound).with_resource(resource)
    }

    /// Attach resource context.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind (HTTP 404): source (resource: project 1 !2)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        write!(f, "{}", self.kind.as_str())?;

        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(resource) = &self.resource {
            write!(f, " (resource: {resource})")?;
        }

        Ok(())
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}
