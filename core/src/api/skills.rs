use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{segment, Query};
use crate::types::{CreateSkillRequest, Skill, SkillWithVersion, UpdateSkillRequest};

impl LocalskillsClient {
    pub async fn create_skill(
        &self,
        cancel: &CancellationToken,
        request: &CreateSkillRequest,
    ) -> Result<Skill, ApiError> {
        self.fetch(cancel, HttpMethod::Post, "/api/skills", Some(request))
            .await
    }

    pub async fn get_skill(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
    ) -> Result<SkillWithVersion, ApiError> {
        let path = format!("/api/skills/{}", segment(skill_id));
        self.fetch(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    pub async fn update_skill(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
        request: &UpdateSkillRequest,
    ) -> Result<Skill, ApiError> {
        let path = format!("/api/skills/{}", segment(skill_id));
        self.fetch(cancel, HttpMethod::Put, &path, Some(request)).await
    }

    /// The backend answers `204 No Content`; only the status is checked.
    pub async fn delete_skill(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/api/skills/{}", segment(skill_id));
        self.expect_success(cancel, HttpMethod::Delete, &path, NO_BODY)
            .await
    }

    /// Skills visible to the caller, filtered by `query` (for example
    /// `tenantId`, `visibility`, `search`).
    pub async fn list_skills(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<Vec<Skill>, ApiError> {
        let path = query.append_to("/api/skills");
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }
}
