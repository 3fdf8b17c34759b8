//! GitLab integration for gitlab-mr-commenter.
//!
//! This crate provides [`GitLabClient`], a blocking client for the GitLab REST
//! API v4 that implements [`mrc_notes::MergeRequestApi`]:
//!
//! - project and merge request lookup
//! - lazy, page-by-page note listing via [`NotesPager`]
//! - note creation and in-place update
//!
//! # API Client
//!
//! ```no_run
//! use mrc_gitlab::GitLabClient;
//! use mrc_notes::MergeRequestApi;
//!
//! let client = GitLabClient::new("https://gitlab.example.com", "glpat-token");
//! let project = client.get_project(123)?;
//! let mr = client.get_merge_request(&project, 45)?;
//! client.create_note(&mr, "Hello from CI")?;
//! # Ok::<(), mrc_notes::RemoteError>(())
//! ```

// API client
mod client;
pub use client::{DEFAULT_PER_PAGE, GitLabClient, NotesPager};

// MergeRequestApi implementation
mod api;

// Errors
pub mod error;
pub use error::GitLabError;
