use crate::models::{Project, ProjectCreate};

use super::{ApiClient, ApiError, RequestOptions};

/// Default page size for project listings
pub const DEFAULT_PAGE_SIZE: u32 = 100;

impl ApiClient {
    pub async fn create_project(&self, data: &ProjectCreate) -> Result<Project, ApiError> {
        self.post_json("/projects", data, RequestOptions::default())
            .await
    }

    /// Projects owned by the current user, each with its photo count.
    pub async fn list_projects(&self, limit: u32, offset: u32) -> Result<Vec<Project>, ApiError> {
        let opts = RequestOptions::default()
            .query("limit", limit)
            .query("offset", offset);
        self.get_json("/projects", opts).await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.get_json(&format!("/projects/{}", project_id), RequestOptions::default())
            .await
    }

    /// Delete a project together with all of its photos.
    pub async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/projects/{}", project_id)).await
    }
}
