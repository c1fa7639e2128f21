use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{segment, Query};
use crate::types::{
    CreateSkillVersionRequest, ExploreSkill, PackageManifest, Skill, SkillAnalytics, SkillContent,
    SkillVersion,
};

#[derive(Serialize)]
struct RevertRequest {
    version: i64,
}

impl LocalskillsClient {
    pub async fn create_skill_version(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
        request: &CreateSkillVersionRequest,
    ) -> Result<SkillVersion, ApiError> {
        let path = format!("/api/skills/{}/versions", segment(skill_id));
        self.fetch(cancel, HttpMethod::Post, &path, Some(request)).await
    }

    pub async fn list_skill_versions(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
    ) -> Result<Vec<SkillVersion>, ApiError> {
        let path = format!("/api/skills/{}/versions", segment(skill_id));
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    /// Content of the current version, or of the one selected by `query`
    /// (`version`, `semver`, `format`).
    pub async fn get_skill_content(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
        query: &Query,
    ) -> Result<SkillContent, ApiError> {
        let path = query.append_to(&format!("/api/skills/{}/content", segment(skill_id)));
        self.fetch(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    pub async fn get_skill_analytics(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
    ) -> Result<SkillAnalytics, ApiError> {
        let path = format!("/api/skills/{}/analytics", segment(skill_id));
        self.fetch(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    /// Makes `version` current again by publishing it as a new version.
    pub async fn revert_skill(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
        version: i64,
    ) -> Result<Skill, ApiError> {
        let path = format!("/api/skills/{}/revert", segment(skill_id));
        let body = RevertRequest { version };
        self.fetch(cancel, HttpMethod::Post, &path, Some(&body)).await
    }

    pub async fn get_skill_manifest(
        &self,
        cancel: &CancellationToken,
        skill_id: &str,
    ) -> Result<PackageManifest, ApiError> {
        let path = format!("/api/skills/{}/manifest", segment(skill_id));
        self.fetch(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    /// Public skill directory.
    pub async fn explore(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<Vec<ExploreSkill>, ApiError> {
        let path = query.append_to("/api/explore");
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }
}
