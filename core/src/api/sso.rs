//! SAML SSO connection of a tenant. The connection always exists; "creating"
//! or "deleting" it is an update of its fields.

use tokio_util::sync::CancellationToken;

use crate::client::{LocalskillsClient, NO_BODY};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::segment;
use crate::types::{SsoConnection, UpdateSsoRequest};

impl LocalskillsClient {
    pub async fn get_sso_connection(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
    ) -> Result<SsoConnection, ApiError> {
        let path = format!("/api/tenants/{}/sso", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Get, &path, NO_BODY).await
    }

    pub async fn update_sso_connection(
        &self,
        cancel: &CancellationToken,
        tenant_id: &str,
        request: &UpdateSsoRequest,
    ) -> Result<SsoConnection, ApiError> {
        let path = format!("/api/tenants/{}/sso", segment(tenant_id));
        self.fetch(cancel, HttpMethod::Patch, &path, Some(request)).await
    }
}
