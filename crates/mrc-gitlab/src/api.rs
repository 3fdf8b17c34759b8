//! [`MergeRequestApi`] implementation backed by the GitLab REST API.

use mrc_notes::{MergeRequest, MergeRequestApi, Note, NoteStream, Project, RemoteError};

use crate::client::{GitLabClient, NotesPager};

impl MergeRequestApi for GitLabClient {
    fn get_project(&self, project_id: u64) -> Result<Project, RemoteError> {
        self.fetch_project(project_id)
            .map_err(|e| e.into_remote(format!("project {project_id}")))
    }

    fn get_merge_request(
        &self,
        project: &Project,
        mr_iid: u64,
    ) -> Result<MergeRequest, RemoteError> {
        self.fetch_merge_request(project.id, mr_iid)
            .map_err(|e| e.into_remote(format!("project {} !{mr_iid}", project.id)))
    }

    fn list_notes<'a>(&'a self, mr: &MergeRequest) -> NoteStream<'a> {
        Box::new(NotesPager::new(self, mr.project_id, mr.iid))
    }

    fn create_note(&self, mr: &MergeRequest, body: &str) -> Result<Note, RemoteError> {
        self.post_note(mr.project_id, mr.iid, body)
            .map_err(|e| e.into_remote(format!("project {} !{}", mr.project_id, mr.iid)))
    }

    fn update_note(
        &self,
        mr: &MergeRequest,
        note_id: u64,
        body: &str,
    ) -> Result<Note, RemoteError> {
        self.put_note(mr.project_id, mr.iid, note_id, body)
            .map_err(|e| e.into_remote(format!("note {note_id}")))
    }
}
