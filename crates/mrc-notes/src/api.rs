//! Remote handles and the [`MergeRequestApi`] trait.

use serde::Deserialize;

use crate::error::RemoteError;

/// GitLab project.
///
/// Only includes fields that are actually used.
/// Serde ignores unknown fields from the API response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    /// Numeric project ID.
    pub id: u64,
    /// Full path (e.g., "group/subgroup/project").
    #[serde(default)]
    pub path_with_namespace: String,
}

/// Merge request within a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeRequest {
    /// Project the merge request belongs to.
    pub project_id: u64,
    /// Internal (project-scoped) ID.
    pub iid: u64,
}

/// Note (comment) on a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Note {
    /// Note ID, unique within the instance.
    pub id: u64,
    /// Markdown body.
    #[serde(default)]
    pub body: String,
}

/// Lazily evaluated sequence of notes.
///
/// Implementations fetch further pages only as the iterator is advanced.
/// The sequence is finite and cannot be restarted; a fetch failure is yielded
/// as an `Err` item.
pub type NoteStream<'a> = Box<dyn Iterator<Item = Result<Note, RemoteError>> + 'a>;

/// Operations on merge request notes.
///
/// This is everything the comment engine asks of a code review host. Every
/// method is a blocking remote call; failures are returned as [`RemoteError`]
/// and never retried by callers.
pub trait MergeRequestApi {
    /// Fetch a project by numeric ID.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the project does not exist or is not
    /// accessible with the configured credentials.
    fn get_project(&self, project_id: u64) -> Result<Project, RemoteError>;

    /// Fetch a merge request by internal ID.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the merge request does not exist or is not accessible.
    fn get_merge_request(&self, project: &Project, mr_iid: u64)
    -> Result<MergeRequest, RemoteError>;

    /// List notes on a merge request, oldest first where the host supports it.
    ///
    /// No request is required to be made until the stream is first advanced.
    fn list_notes<'a>(&'a self, mr: &MergeRequest) -> NoteStream<'a>;

    /// Create a note with the given body.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the write fails.
    fn create_note(&self, mr: &MergeRequest, body: &str) -> Result<Note, RemoteError>;

    /// Replace the body of an existing note.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the note does not exist or the write fails.
    fn update_note(
        &self,
        mr: &MergeRequest,
        note_id: u64,
        body: &str,
    ) -> Result<Note, RemoteError>;
}

impl<T: MergeRequestApi + ?Sized> MergeRequestApi for &T {
    fn get_project(&self, project_id: u64) -> Result<Project, RemoteError> {
        (**self).get_project(project_id)
    }

    fn get_merge_request(
        &self,
        project: &Project,
        mr_iid: u64,
    ) -> Result<MergeRequest, RemoteError> {
        (**self).get_merge_request(project, mr_iid)
    }

    fn list_notes<'a>(&'a self, mr: &MergeRequest) -> NoteStream<'a> {
        (**self).list_notes(mr)
    }

    fn create_note(&self, mr: &MergeRequest, body: &str) -> Result<Note, RemoteError> {
        (**self).create_note(mr, body)
    }

    fn update_note(
        &self,
        mr: &MergeRequest,
        note_id: u64,
        body: &str,
    ) -> Result<Note, RemoteError> {
        (**self).update_note(mr, note_id, body)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_note_ignores_unknown_fields() {
        let json = r#"{
            "id": 302,
            "body": "closed",
            "attachment": null,
            "author": {"id": 1, "username": "pipin"},
            "created_at": "2013-10-02T09:22:45Z",
            "system": true,
            "noteable_id": 377,
            "noteable_type": "MergeRequest"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(
            note,
            Note {
                id: 302,
                body: "closed".to_owned(),
            }
        );
    }

    #[test]
    fn test_note_missing_body_defaults_empty() {
        let note: Note = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(note.body, "");
    }

    #[test]
    fn test_merge_request_deserialize() {
        let json = r#"{
            "id": 1,
            "iid": 45,
            "project_id": 123,
            "title": "Add plan output",
            "state": "opened",
            "web_url": "https://gitlab.example.com/group/app/-/merge_requests/45"
        }"#;
        let mr: MergeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(mr.project_id, 123);
        assert_eq!(mr.iid, 45);
    }

    #[test]
    fn test_project_deserialize() {
        let json = r#"{"id": 123, "name": "app", "path_with_namespace": "group/app"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, 123);
        assert_eq!(project.path_with_namespace, "group/app");
    }
}
