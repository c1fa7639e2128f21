use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{segment, Query};
use crate::types::{AuditLogPage, UserProfile};

impl LocalskillsClient {
    /// Profile of the token's owner.
    pub async fn get_user_profile(
        &self,
        cancel: &CancellationToken,
    ) -> Result<UserProfile, ApiError> {
        self.fetch(cancel, HttpMethod::Get, "/api/user/profile", NO_BODY)
            .await
    }

    pub async fn list_user_audit_log(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<AuditLogPage, ApiError> {
        let path = query.append_to("/api/user/audit-log");
        self.audit_log_page(cancel, &path).await
    }

    pub async fn list_team_audit_log(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        query: &Query,
    ) -> Result<AuditLogPage, ApiError> {
        let path = query.append_to(&format!("/api/tenants/{}/audit-log", segment(tenant_id)));
        self.audit_log_page(cancel, &path).await
    }

    /// A page without `data` is an empty page.
    async fn audit_log_page(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<AuditLogPage, ApiError> {
        Ok(self
            .decode_json(cancel, HttpMethod::Get, path, NO_BODY)
            .await?
            .unwrap_or_default())
    }
}
