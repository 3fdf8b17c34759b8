//! Configuration resolution for gitlab-mr-commenter.
//!
//! Every setting follows the same ordered fallback chain: an explicit value,
//! then one or more environment variables, then an error. The environment is
//! captured once into an [`EnvSnapshot`]; nothing in this crate reads the
//! process environment on its own.
//!
//! ## Recognized Environment Variables
//!
//! - `GITLAB_MR_PLAN_TOKEN` - API token (preferred)
//! - `GITLAB_TOKEN` - API token (deprecated fallback)
//! - `CI_API_V4_URL` - GitLab API base URL
//! - `CI_PROJECT_ID` - project ID
//! - `CI_MERGE_REQUEST_IID` - merge request internal ID
//!
//! Connection settings resolve to either a remote GitLab connection or, when no
//! API URL is available and the caller opted in, to local mode:
//!
//! ```
//! use mrc_config::{Connection, ConnectionSettings, EnvSnapshot};
//!
//! let settings = ConnectionSettings {
//!     local_fallback: true,
//!     ..ConnectionSettings::default()
//! };
//! let connection = settings.resolve(&EnvSnapshot::default())?;
//! assert!(matches!(connection, Connection::Local));
//! # Ok::<(), mrc_config::ConfigError>(())
//! ```

mod env;

use std::fmt;

use tracing::{debug, warn};

pub use env::{
    API_URL_VAR, EnvSnapshot, Fallback, LEGACY_TOKEN_VAR, MR_IID_VAR, PROJECT_ID_VAR, Source,
    TOKEN_VAR,
};

/// Versioned API path stripped from the API URL to obtain the instance root.
pub const API_SUFFIX: &str = "/api/v4";

/// Connection settings as supplied by the caller.
///
/// `None` fields fall back to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    /// GitLab personal, project or CI access token.
    pub token: Option<String>,
    /// GitLab API v4 base URL (e.g. `https://gitlab.com/api/v4`).
    pub api_url: Option<String>,
    /// Use local mode when no API URL can be resolved.
    pub local_fallback: bool,
}

/// Resolved connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Talk to a GitLab instance.
    Remote(RemoteConfig),
    /// No API URL available: print comments locally instead.
    Local,
}

/// Credentials and address of a GitLab instance.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Instance root URL, without the `/api/v4` suffix.
    pub instance_url: String,
    /// Private token sent with every request.
    pub token: String,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("instance_url", &self.instance_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ConnectionSettings {
    /// Resolve the connection.
    ///
    /// The token is only looked up when an API URL is available; local mode
    /// never requires one.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingApiUrl`] if no URL resolves and `local_fallback` is off
    /// - [`ConfigError::Validation`] if the URL is not http(s)
    /// - [`ConfigError::MissingToken`] if a URL resolves but no token does
    pub fn resolve(&self, env: &EnvSnapshot) -> Result<Connection, ConfigError> {
        let Some((api_url, url_source)) = Fallback::new(self.api_url.as_deref())
            .or_env(API_URL_VAR)
            .resolve(env)
        else {
            if self.local_fallback {
                debug!("No API URL available, using local mode");
                return Ok(Connection::Local);
            }
            return Err(ConfigError::MissingApiUrl);
        };
        require_http_url(api_url, url_source)?;

        let (token, token_source) = Fallback::new(self.token.as_deref())
            .or_env(TOKEN_VAR)
            .or_env(LEGACY_TOKEN_VAR)
            .resolve(env)
            .ok_or(ConfigError::MissingToken)?;
        if token_source == Source::Env(LEGACY_TOKEN_VAR) {
            warn!("{LEGACY_TOKEN_VAR} is deprecated, set {TOKEN_VAR} instead");
        }

        let instance_url = instance_root(api_url);
        debug!(
            "Using GitLab instance {} (URL from {}, token from {})",
            instance_url, url_source, token_source
        );
        Ok(Connection::Remote(RemoteConfig {
            instance_url,
            token: token.to_owned(),
        }))
    }
}

/// Strip the versioned API suffix (and trailing slashes) from an API URL.
///
/// ```
/// assert_eq!(
///     mrc_config::instance_root("https://gitlab.example.com/api/v4/"),
///     "https://gitlab.example.com"
/// );
/// ```
#[must_use]
pub fn instance_root(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    trimmed
        .strip_suffix(API_SUFFIX)
        .unwrap_or(trimmed)
        .to_owned()
}

/// Merge request coordinates as supplied by the caller.
///
/// `None` fields fall back to `CI_PROJECT_ID` and `CI_MERGE_REQUEST_IID`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSettings {
    /// Numeric GitLab project ID.
    pub project_id: Option<u64>,
    /// Merge request internal (project-scoped) ID.
    pub mr_iid: Option<u64>,
}

/// Resolved merge request coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    /// Numeric GitLab project ID.
    pub project_id: u64,
    /// Merge request internal ID.
    pub mr_iid: u64,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project {} !{}", self.project_id, self.mr_iid)
    }
}

impl TargetSettings {
    /// Settings with both IDs given explicitly.
    #[must_use]
    pub fn explicit(project_id: u64, mr_iid: u64) -> Self {
        Self {
            project_id: Some(project_id),
            mr_iid: Some(mr_iid),
        }
    }

    /// Resolve both IDs.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingTarget`] if an ID is neither given nor set in the environment
    /// - [`ConfigError::InvalidId`] if an ID is zero or not a number
    pub fn resolve(&self, env: &EnvSnapshot) -> Result<Target, ConfigError> {
        Ok(Target {
            project_id: resolve_id(self.project_id, "project_id", PROJECT_ID_VAR, env)?,
            mr_iid: resolve_id(self.mr_iid, "mr_iid", MR_IID_VAR, env)?,
        })
    }
}

fn resolve_id(
    explicit: Option<u64>,
    field: &'static str,
    var: &'static str,
    env: &EnvSnapshot,
) -> Result<u64, ConfigError> {
    let (id, origin) = match explicit {
        Some(id) => (id, Source::Explicit),
        None => {
            let (raw, origin) = Fallback::new(None)
                .or_env(var)
                .resolve(env)
                .ok_or(ConfigError::MissingTarget { field, var })?;
            let id = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidId {
                field,
                origin,
                value: raw.to_owned(),
            })?;
            (id, origin)
        }
    };

    if id == 0 {
        return Err(ConfigError::InvalidId {
            field,
            origin,
            value: id.to_string(),
        });
    }
    Ok(id)
}

/// Configuration error.
///
/// Always raised before any remote call is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No API URL given and none in the environment.
    #[error("No GitLab API URL found. Pass api_url or set {}.", API_URL_VAR)]
    MissingApiUrl,
    /// API URL available but no token.
    #[error(
        "No GitLab token found. Pass token or set {} / {}.",
        TOKEN_VAR,
        LEGACY_TOKEN_VAR
    )]
    MissingToken,
    /// Project or merge request ID missing.
    #[error("{field} not provided and {var} is not set")]
    MissingTarget {
        /// Setting name (e.g., "`project_id`").
        field: &'static str,
        /// Environment variable consulted.
        var: &'static str,
    },
    /// Project or merge request ID is not a positive integer.
    #[error("{field} must be a positive integer, got {value:?} from {origin}")]
    InvalidId {
        /// Setting name (e.g., "`mr_iid`").
        field: &'static str,
        /// Where the value came from.
        origin: Source,
        /// Offending value.
        value: String,
    },
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a URL to use http:// or https:// scheme.
fn require_http_url(url: &str, source: Source) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "API URL from {source} must start with http:// or https://"
        )));
    }
    Ok(())
}
