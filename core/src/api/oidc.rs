use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::segment;
use crate::types::{CreateOidcPolicyRequest, OidcTrustPolicy, UpdateOidcPolicyRequest};

impl LocalskillsClient {
    pub async fn list_oidc_policies(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
    ) -> Result<Vec<OidcTrustPolicy>, ApiError> {
        let path = format!("/api/tenants/{}/oidc-policies", segment(tenant_id));
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    pub async fn create_oidc_policy(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        request: &CreateOidcPolicyRequest,
    ) -> Result<OidcTrustPolicy, ApiError> {
        let path = format!("/api/tenants/{}/oidc-policies", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Post, &path, Some(request)).await
    }

    pub async fn update_oidc_policy(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        policy_id: &str,
        request: &UpdateOidcPolicyRequest,
    ) -> Result<OidcTrustPolicy, ApiError> {
        let path = format!(
            "/api/tenants/{}/oidc-policies/{}",
            segment(tenant_id),
            segment(policy_id)
        );
        self.fetch(cancel, HttpMethod::Patch, &path, Some(request)).await
    }

    pub async fn delete_oidc_policy(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        policy_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!(
            "/api/tenants/{}/oidc-policies/{}",
            segment(tenant_id),
            segment(policy_id)
        );
        self.execute(cancel, HttpMethod::Delete, &path, NO_BODY).await
    }
}
