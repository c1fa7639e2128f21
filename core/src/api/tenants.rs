use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::segment;
use crate::types::{
    CreateInvitationRequest, CreateTenantRequest, Tenant, TenantInvitation, TenantWithRole,
    UpdateTenantRequest,
};

impl LocalskillsClient {
    pub async fn create_tenant(
        &self,
        cancel: &CancellationToken,
        request: &CreateTenantRequest,
    ) -> Result<Tenant, ApiError> {
        self.fetch(cancel, HttpMethod::Post, "/api/tenants", Some(request))
            .await
    }

    /// Tenants the caller belongs to. There is no single-tenant read, so
    /// lookups filter this list.
    pub async fn list_tenants(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<TenantWithRole>, ApiError> {
        self.fetch_list(cancel, HttpMethod::Get, "/api/tenants", NO_BODY)
            .await
    }

    pub async fn update_tenant(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        request: &UpdateTenantRequest,
    ) -> Result<Tenant, ApiError> {
        let path = format!("/api/tenants/{}", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Patch, &path, Some(request)).await
    }

    pub async fn create_invitation(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        request: &CreateInvitationRequest,
    ) -> Result<TenantInvitation, ApiError> {
        let path = format!("/api/tenants/{}/invitations", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Post, &path, Some(request)).await
    }

    pub async fn list_invitations(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
    ) -> Result<Vec<TenantInvitation>, ApiError> {
        let path = format!("/api/tenants/{}/invitations", segment(tenant_id));
        self.fetch_list(cancel, HttpMethod::Get, &path, NO_BODY).await
    }
}
