//! GitLab REST API client.
//!
//! Provides sync HTTP client for the GitLab REST API v4 with private token
//! authentication.

mod merge_requests;
mod notes;

use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::Agent;
use ureq::http::Response;

use mrc_config::{API_SUFFIX, RemoteConfig};

use crate::error::GitLabError;

pub use notes::NotesPager;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Notes requested per page (the GitLab maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Header carrying the private token.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab REST API client.
pub struct GitLabClient {
    agent: Agent,
    base_url: String,
    token: String,
    per_page: u32,
}

/// HTTP method of a write request.
#[derive(Debug, Clone, Copy)]
enum WriteMethod {
    Post,
    Put,
}

impl GitLabClient {
    /// Create client for a GitLab instance.
    ///
    /// # Arguments
    /// * `instance_url` - GitLab instance root (e.g. `https://gitlab.com`), without `/api/v4`
    /// * `token` - personal, project or CI access token
    #[must_use]
    pub fn new(instance_url: &str, token: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: instance_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Create client from a resolved remote configuration.
    #[must_use]
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(&config.instance_url, &config.token)
    }

    /// Set the number of notes requested per page (clamped to 1..=100).
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, DEFAULT_PER_PAGE);
        self
    }

    /// Get the instance base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}{}", self.base_url, API_SUFFIX)
    }

    /// Send an authenticated GET request.
    fn get(&self, url: &str) -> Result<Response<ureq::Body>, GitLabError> {
        let response = self
            .agent
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
            .call()?;
        check_status(response)
    }

    /// Send an authenticated request with a JSON payload.
    fn write_json(
        &self,
        method: WriteMethod,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Response<ureq::Body>, GitLabError> {
        let payload_bytes = serde_json::to_vec(payload)?;

        let request = match method {
            WriteMethod::Post => self.agent.post(url),
            WriteMethod::Put => self.agent.put(url),
        };
        let response = request
            .header(TOKEN_HEADER, &self.token)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;
        check_status(response)
    }
}

/// Turn an error status into [`GitLabError::HttpResponse`].
fn check_status(response: Response<ureq::Body>) -> Result<Response<ureq::Body>, GitLabError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let error_body = response
            .into_body()
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(GitLabError::HttpResponse {
            status,
            body: error_body,
        });
    }
    Ok(response)
}

/// Decode a JSON response body.
fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T, GitLabError> {
    let text = response.into_body().read_to_string()?;
    Ok(serde_json::from_str(&text)?)
}

/// Path of a project resource.
fn project_path(project_id: u64) -> String {
    format!("/projects/{project_id}")
}

/// Path of a merge request resource.
fn merge_request_path(project_id: u64, mr_iid: u64) -> String {
    format!("{}/merge_requests/{mr_iid}", project_path(project_id))
}

/// Path of a merge request's notes collection.
fn notes_path(project_id: u64, mr_iid: u64) -> String {
    format!("{}/notes", merge_request_path(project_id, mr_iid))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_api_url_appends_suffix() {
        let client = GitLabClient::new("https://gitlab.example.com/", "t");
        assert_eq!(client.base_url(), "https://gitlab.example.com");
        assert_eq!(client.api_url(), "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn test_from_config() {
        let client = GitLabClient::from_config(&RemoteConfig {
            instance_url: "https://gitlab.com".to_owned(),
            token: "glpat".to_owned(),
        });
        assert_eq!(client.api_url(), "https://gitlab.com/api/v4");
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(project_path(123), "/projects/123");
        assert_eq!(merge_request_path(123, 45), "/projects/123/merge_requests/45");
        assert_eq!(notes_path(123, 45), "/projects/123/merge_requests/45/notes");
    }

    #[test]
    fn test_per_page_clamped() {
        let client = GitLabClient::new("https://gitlab.com", "t").with_per_page(500);
        assert_eq!(client.per_page, DEFAULT_PER_PAGE);
        let client = GitLabClient::new("https://gitlab.com", "t").with_per_page(0);
        assert_eq!(client.per_page, 1);
    }
}
