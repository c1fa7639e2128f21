//! User, team and SCIM tokens. Secrets are only returned by the create calls.

use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::segment;
use crate::types::{
    ApiToken, ApiTokenWithSecret, CreateExpiringTokenRequest, CreateTokenRequest, ScimToken,
    ScimTokenWithSecret, TeamApiToken, TeamApiTokenWithSecret,
};

impl LocalskillsClient {
    pub async fn list_user_tokens(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApiToken>, ApiError> {
        self.fetch_list(cancel, HttpMethod::Get, "/api/user/tokens", NO_BODY)
            .await
    }

    pub async fn create_user_token(
        &self,
        cancel: &CancellationToken,
        request: &CreateTokenRequest,
    ) -> Result<ApiTokenWithSecret, ApiError> {
        self.fetch(cancel, HttpMethod::Post, "/api/user/tokens", Some(request))
            .await
    }

    pub async fn delete_user_token(
        &self,
        cancel: &CancellationToken,
        token_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/api/user/tokens/{}", segment(token_id));
        self.execute(cancel, HttpMethod::Delete, &path, NO_BODY).await
    }

    pub async fn list_team_tokens(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
    ) -> Result<Vec<TeamApiToken>, ApiError> {
        let path = format!("/api/tenants/{}/tokens", segment(tenant_id));
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    pub async fn create_team_token(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        request: &CreateExpiringTokenRequest,
    ) -> Result<TeamApiTokenWithSecret, ApiError> {
        let path = format!("/api/tenants/{}/tokens", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Post, &path, Some(request)).await
    }

    pub async fn delete_team_token(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        token_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!(
            "/api/tenants/{}/tokens/{}",
            segment(tenant_id),
            segment(token_id)
        );
        self.execute(cancel, HttpMethod::Delete, &path, NO_BODY).await
    }

    pub async fn list_scim_tokens(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
    ) -> Result<Vec<ScimToken>, ApiError> {
        let path = format!("/api/tenants/{}/scim-tokens", segment(tenant_id));
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    pub async fn create_scim_token(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        request: &CreateExpiringTokenRequest,
    ) -> Result<ScimTokenWithSecret, ApiError> {
        let path = format!("/api/tenants/{}/scim-tokens", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Post, &path, Some(request)).await
    }

    pub async fn delete_scim_token(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        token_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!(
            "/api/tenants/{}/scim-tokens/{}",
            segment(tenant_id),
            segment(token_id)
        );
        self.execute(cancel, HttpMethod::Delete, &path, NO_BODY).await
    }
}
