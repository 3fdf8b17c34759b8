//! Environment snapshot and fallback chains.
//!
//! The process environment is read exactly once, at the binary boundary, into an
//! [`EnvSnapshot`]. Everything downstream resolves values from the snapshot, so
//! library code and tests never touch ambient process state.

use std::collections::HashMap;
use std::fmt;

/// Preferred variable for the GitLab API token.
pub const TOKEN_VAR: &str = "GITLAB_MR_PLAN_TOKEN";

/// Deprecated alias for [`TOKEN_VAR`].
pub const LEGACY_TOKEN_VAR: &str = "GITLAB_TOKEN";

/// GitLab API v4 base URL, set by GitLab CI.
pub const API_URL_VAR: &str = "CI_API_V4_URL";

/// Numeric project ID, set by GitLab CI.
pub const PROJECT_ID_VAR: &str = "CI_PROJECT_ID";

/// Merge request internal ID, set by GitLab CI in merge request pipelines.
pub const MR_IID_VAR: &str = "CI_MERGE_REQUEST_IID";

/// Variables captured by [`EnvSnapshot::from_process`].
const RECOGNIZED_VARS: [&str; 5] = [
    TOKEN_VAR,
    LEGACY_TOKEN_VAR,
    API_URL_VAR,
    PROJECT_ID_VAR,
    MR_IID_VAR,
];

/// Variables whose values never appear in debug output.
const SECRET_VARS: [&str; 2] = [TOKEN_VAR, LEGACY_TOKEN_VAR];

/// Immutable copy of the recognized environment variables.
///
/// Empty values are treated as unset.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the recognized variables from the current process.
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_pairs(
            RECOGNIZED_VARS
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|value| (*name, value))),
        )
    }

    /// Build a snapshot from explicit name/value pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Self { vars }
    }

    /// Value of a variable, if set and non-empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

impl fmt::Debug for EnvSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut names: Vec<_> = self.vars.keys().collect();
        names.sort();
        for name in names {
            if SECRET_VARS.contains(&name.as_str()) {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, &self.vars[name]);
            }
        }
        map.finish()
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Passed in directly by the caller.
    Explicit,
    /// Read from the named environment variable.
    Env(&'static str),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("explicit value"),
            Self::Env(name) => write!(f, "${name}"),
        }
    }
}

/// Ordered fallback chain for one setting: explicit value, then each variable in turn.
///
/// # Example
///
/// ```
/// use mrc_config::{EnvSnapshot, Fallback, Source};
///
/// let env = EnvSnapshot::from_pairs([("GITLAB_TOKEN", "glpat-legacy")]);
/// let resolved = Fallback::new(None)
///     .or_env("GITLAB_MR_PLAN_TOKEN")
///     .or_env("GITLAB_TOKEN")
///     .resolve(&env);
/// assert_eq!(resolved, Some(("glpat-legacy", Source::Env("GITLAB_TOKEN"))));
/// ```
#[derive(Debug, Clone)]
pub struct Fallback<'a> {
    explicit: Option<&'a str>,
    vars: Vec<&'static str>,
}

impl<'a> Fallback<'a> {
    /// Start a chain with an optional explicit value. Empty strings count as absent.
    #[must_use]
    pub fn new(explicit: Option<&'a str>) -> Self {
        Self {
            explicit: explicit.filter(|value| !value.is_empty()),
            vars: Vec::new(),
        }
    }

    /// Append an environment variable to the chain.
    #[must_use]
    pub fn or_env(mut self, name: &'static str) -> Self {
        self.vars.push(name);
        self
    }

    /// First available value and its source.
    #[must_use]
    pub fn resolve(&self, env: &'a EnvSnapshot) -> Option<(&'a str, Source)> {
        if let Some(value) = self.explicit {
            return Some((value, Source::Explicit));
        }
        self.vars
            .iter()
            .find_map(|&name| env.get(name).map(|value| (value, Source::Env(name))))
    }
}
