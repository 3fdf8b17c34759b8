//! Project and merge request lookups for GitLab API.

use tracing::info;

use mrc_notes::{MergeRequest, Project};

use super::{GitLabClient, merge_request_path, project_path, read_json};
use crate::error::GitLabError;

impl GitLabClient {
    /// Get project by numeric ID.
    pub(crate) fn fetch_project(&self, project_id: u64) -> Result<Project, GitLabError> {
        let url = format!("{}{}", self.api_url(), project_path(project_id));

        info!("Getting project {}", project_id);

        let project: Project = read_json(self.get(&url)?)?;
        info!(
            "Found project {} ({})",
            project.id, project.path_with_namespace
        );
        Ok(project)
    }

    /// Get merge request by internal ID.
    pub(crate) fn fetch_merge_request(
        &self,
        project_id: u64,
        mr_iid: u64,
    ) -> Result<MergeRequest, GitLabError> {
        let url = format!(
            "{}{}",
            self.api_url(),
            merge_request_path(project_id, mr_iid)
        );

        info!("Getting merge request !{} in project {}", mr_iid, project_id);

        read_json(self.get(&url)?)
    }
}
