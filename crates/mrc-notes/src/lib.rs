//! Merge request notes abstraction for gitlab-mr-commenter.
//!
//! This crate defines the capability set the comment engine needs from a code
//! review host, without tying it to an HTTP client. This enables:
//!
//! - **Unit testing** the engine against an in-memory fake
//! - **Lazy scanning** of paginated note lists through a pull-based iterator
//!
//! # Architecture
//!
//! The crate provides:
//! - [`MergeRequestApi`] trait with project, merge request and note operations
//! - [`Project`], [`MergeRequest`] and [`Note`] handles
//! - [`RemoteError`] with a semantic [`RemoteErrorKind`] and the backend's source error
//! - [`MockGitLab`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use mrc_notes::MergeRequestApi;
//!
//! let project = api.get_project(123)?;
//! let mr = api.get_merge_request(&project, 45)?;
//! for note in api.list_notes(&mr) {
//!     let note = note?;
//!     println!("{}: {}", note.id, note.body);
//! }
//! ```

mod api;
mod error;
#[cfg(feature = "mock")]
mod mock;

pub use api::{MergeRequest, MergeRequestApi, Note, NoteStream, Project};
pub use error::{RemoteError, RemoteErrorKind};
#[cfg(feature = "mock")]
pub use mock::{CallCounts, MockGitLab, Operation};
