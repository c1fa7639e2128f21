//! In-memory stand-in for the Localskills API.
//!
//! Responses use the `{"success", "data", "error"}` envelope, except skill
//! deletion, which answers `204 No Content` with no body. Requests
//! must carry `Authorization: Bearer lsk_...`; the token itself is not looked
//! up. State lives for the lifetime of the router returned by [`app`].

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const TOKEN_PREFIX: &str = "lsk_";

const TIMESTAMP: &str = "2025-01-01T00:00:00Z";

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub public_id: String,
    pub tenant_id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(rename = "type")]
    pub skill_type: String,
    pub visibility: String,
    pub tags: Vec<String>,
    pub current_version: i64,
    pub current_semver: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillVersion {
    pub id: String,
    pub skill_id: String,
    pub version: i64,
    pub semver: String,
    pub message: String,
    pub created_at: String,
    #[serde(skip)]
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: String,
    pub name: String,
    pub last_used_at: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcPolicy {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub provider: String,
    pub repository: String,
    pub ref_filter: String,
    pub environment_filter: Option<String>,
    pub skill_ids: Vec<String>,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoConnection {
    pub tenant_id: String,
    pub display_name: String,
    pub metadata_url: String,
    pub default_role: String,
    pub email_domains: Vec<String>,
    pub enabled: bool,
    pub require_sso: bool,
}

impl SsoConnection {
    fn disabled(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            display_name: String::new(),
            metadata_url: String::new(),
            default_role: "member".to_string(),
            email_domains: Vec::new(),
            enabled: false,
            require_sso: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSkill {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub skill_type: String,
    pub visibility: String,
    pub content: String,
    pub tenant_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateSkill {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct CreateVersion {
    pub content: String,
    pub message: Option<String>,
    pub semver: Option<String>,
    pub bump: Option<String>,
}

#[derive(Deserialize)]
pub struct ContentQuery {
    pub version: Option<i64>,
}

#[derive(Deserialize)]
pub struct SkillFilter {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTenant {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateToken {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicy {
    pub name: String,
    pub provider: String,
    pub repository: String,
    #[serde(default)]
    pub ref_filter: Option<String>,
    #[serde(default)]
    pub environment_filter: Option<String>,
    #[serde(default)]
    pub skill_ids: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicy {
    pub name: Option<String>,
    pub repository: Option<String>,
    pub ref_filter: Option<String>,
    pub environment_filter: Option<String>,
    pub skill_ids: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSso {
    pub display_name: Option<String>,
    pub metadata_url: Option<String>,
    pub default_role: Option<String>,
    pub email_domains: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub require_sso: Option<bool>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Success envelope around `data`.
pub struct Data<T>(pub T);

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(json!({ "success": true, "data": self.0 })).into_response()
    }
}

/// Failure envelope with a message.
#[derive(Debug)]
pub struct Failure {
    pub status: StatusCode,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

type Reply<T> = Result<Data<T>, Failure>;

// ---------------------------------------------------------------------------
// State and routing
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Store {
    skills: HashMap<String, Skill>,
    versions: HashMap<String, Vec<SkillVersion>>,
    tenants: HashMap<String, Tenant>,
    tokens: HashMap<String, ApiToken>,
    policies: HashMap<String, OidcPolicy>,
    sso: HashMap<String, SsoConnection>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/skills", get(list_skills).post(create_skill))
        .route(
            "/api/skills/{id}",
            get(get_skill).put(update_skill).delete(delete_skill),
        )
        .route(
            "/api/skills/{id}/versions",
            get(list_versions).post(create_version),
        )
        .route("/api/skills/{id}/content", get(get_content))
        .route("/api/tenants", get(list_tenants).post(create_tenant))
        .route("/api/tenants/{id}", patch(update_tenant))
        .route(
            "/api/tenants/{id}/oidc-policies",
            get(list_policies).post(create_policy),
        )
        .route(
            "/api/tenants/{id}/oidc-policies/{policy_id}",
            patch(update_policy).delete(delete_policy),
        )
        .route("/api/tenants/{id}/sso", get(get_sso).patch(update_sso))
        .route("/api/user/profile", get(get_profile))
        .route("/api/user/tokens", get(list_tokens).post(create_token))
        .route("/api/user/tokens/{id}", delete(delete_token))
        .layer(middleware::from_fn(require_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_token(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token.len() > TOKEN_PREFIX.len() && token.starts_with(TOKEN_PREFIX));
    if !authorized {
        return Failure::new(StatusCode::UNAUTHORIZED, "invalid or missing API token")
            .into_response();
    }
    next.run(request).await
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Next semver after `current`. An unparseable version restarts at `1.0.0`.
pub fn bump_semver(current: &str, bump: &str) -> String {
    let parts: Vec<u64> = current
        .split('.')
        .filter_map(|part| part.parse().ok())
        .collect();
    let [major, minor, patch] = parts[..] else {
        return "1.0.0".to_string();
    };
    match bump {
        "major" => format!("{}.0.0", major + 1),
        "minor" => format!("{major}.{}.0", minor + 1),
        _ => format!("{major}.{minor}.{}", patch + 1),
    }
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

async fn list_skills(State(db): State<Db>, Query(filter): Query<SkillFilter>) -> Reply<Vec<Skill>> {
    let store = db.read().await;
    let mut skills: Vec<Skill> = store
        .skills
        .values()
        .filter(|skill| filter.tenant_id.as_ref().map_or(true, |t| &skill.tenant_id == t))
        .cloned()
        .collect();
    skills.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Data(skills))
}

async fn create_skill(State(db): State<Db>, Json(input): Json<CreateSkill>) -> Reply<Skill> {
    if input.name.trim().is_empty() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "name is required"));
    }
    let mut store = db.write().await;
    if !store.tenants.contains_key(&input.tenant_id) {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "unknown tenant"));
    }
    let id = new_id();
    let skill = Skill {
        id: id.clone(),
        public_id: id[..8].to_string(),
        tenant_id: input.tenant_id,
        slug: slugify(&input.name),
        name: input.name,
        description: input.description,
        skill_type: input.skill_type,
        visibility: input.visibility,
        tags: input.tags,
        current_version: 1,
        current_semver: "1.0.0".to_string(),
        created_at: TIMESTAMP.to_string(),
        updated_at: TIMESTAMP.to_string(),
    };
    let first = SkillVersion {
        id: new_id(),
        skill_id: id.clone(),
        version: 1,
        semver: "1.0.0".to_string(),
        message: "Initial version".to_string(),
        created_at: TIMESTAMP.to_string(),
        content: input.content,
    };
    store.versions.insert(id.clone(), vec![first]);
    store.skills.insert(id, skill.clone());
    Ok(Data(skill))
}

async fn get_skill(State(db): State<Db>, Path(id): Path<String>) -> Reply<serde_json::Value> {
    let store = db.read().await;
    let skill = store.skills.get(&id).ok_or_else(|| Failure::not_found("skill"))?;
    let current = store
        .versions
        .get(&id)
        .and_then(|versions| versions.iter().find(|v| v.version == skill.current_version));

    let mut body = serde_json::to_value(skill)
        .map_err(|err| Failure::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    body["currentVersionInfo"] = json!(current);
    Ok(Data(body))
}

async fn update_skill(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateSkill>,
) -> Reply<Skill> {
    let mut store = db.write().await;
    let skill = store.skills.get_mut(&id).ok_or_else(|| Failure::not_found("skill"))?;
    if let Some(name) = input.name {
        skill.slug = slugify(&name);
        skill.name = name;
    }
    if let Some(description) = input.description {
        skill.description = description;
    }
    if let Some(visibility) = input.visibility {
        skill.visibility = visibility;
    }
    if let Some(tags) = input.tags {
        skill.tags = tags;
    }
    Ok(Data(skill.clone()))
}

/// Answers `204 No Content` without an envelope, as the real backend does.
async fn delete_skill(State(db): State<Db>, Path(id): Path<String>) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store.skills.remove(&id).ok_or_else(|| Failure::not_found("skill"))?;
    store.versions.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(State(db): State<Db>, Path(id): Path<String>) -> Reply<Vec<SkillVersion>> {
    let store = db.read().await;
    let versions = store.versions.get(&id).ok_or_else(|| Failure::not_found("skill"))?;
    let mut versions = versions.clone();
    versions.reverse();
    Ok(Data(versions))
}

async fn create_version(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<CreateVersion>,
) -> Reply<SkillVersion> {
    let mut store = db.write().await;
    let Store {
        skills, versions, ..
    } = &mut *store;
    let skill = skills.get_mut(&id).ok_or_else(|| Failure::not_found("skill"))?;
    let history = versions.entry(id.clone()).or_default();

    let semver = match input.semver {
        Some(semver) if history.iter().any(|v| v.semver == semver) => {
            return Err(Failure::new(
                StatusCode::CONFLICT,
                format!("version {semver} already exists"),
            ));
        }
        Some(semver) => semver,
        None => bump_semver(
            &skill.current_semver,
            input.bump.as_deref().unwrap_or("patch"),
        ),
    };

    let version = SkillVersion {
        id: new_id(),
        skill_id: id,
        version: skill.current_version + 1,
        semver,
        message: input.message.unwrap_or_default(),
        created_at: TIMESTAMP.to_string(),
        content: input.content,
    };
    skill.current_version = version.version;
    skill.current_semver = version.semver.clone();
    history.push(version.clone());
    Ok(Data(version))
}

async fn get_content(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Reply<serde_json::Value> {
    let store = db.read().await;
    let skill = store.skills.get(&id).ok_or_else(|| Failure::not_found("skill"))?;
    let wanted = query.version.unwrap_or(skill.current_version);
    let version = store
        .versions
        .get(&id)
        .and_then(|versions| versions.iter().find(|v| v.version == wanted))
        .ok_or_else(|| Failure::not_found("version"))?;
    Ok(Data(json!({
        "skill": skill,
        "format": "markdown",
        "content": version.content,
        "version": version.version,
        "semver": version.semver,
    })))
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

async fn list_tenants(State(db): State<Db>) -> Reply<Vec<Tenant>> {
    let store = db.read().await;
    let mut tenants: Vec<Tenant> = store.tenants.values().cloned().collect();
    tenants.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(Data(tenants))
}

async fn create_tenant(State(db): State<Db>, Json(input): Json<CreateTenant>) -> Reply<Tenant> {
    let slug = slugify(&input.name);
    if slug.is_empty() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "name is required"));
    }
    let mut store = db.write().await;
    if store.tenants.values().any(|t| t.slug == slug) {
        return Err(Failure::new(StatusCode::CONFLICT, "slug already taken"));
    }
    let tenant = Tenant {
        id: new_id(),
        name: input.name,
        slug,
        description: String::new(),
        role: "owner".to_string(),
        created_at: TIMESTAMP.to_string(),
    };
    store.tenants.insert(tenant.id.clone(), tenant.clone());
    Ok(Data(tenant))
}

async fn update_tenant(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTenant>,
) -> Reply<Tenant> {
    let mut store = db.write().await;
    let tenant = store.tenants.get_mut(&id).ok_or_else(|| Failure::not_found("tenant"))?;
    if let Some(name) = input.name {
        tenant.name = name;
    }
    if let Some(slug) = input.slug {
        tenant.slug = slug;
    }
    if let Some(description) = input.description {
        tenant.description = description;
    }
    Ok(Data(tenant.clone()))
}

fn ensure_tenant(store: &Store, tenant_id: &str) -> Result<(), Failure> {
    if store.tenants.contains_key(tenant_id) {
        Ok(())
    } else {
        Err(Failure::not_found("tenant"))
    }
}

// ---------------------------------------------------------------------------
// OIDC trust policies
// ---------------------------------------------------------------------------

async fn list_policies(State(db): State<Db>, Path(tenant_id): Path<String>) -> Reply<Vec<OidcPolicy>> {
    let store = db.read().await;
    ensure_tenant(&store, &tenant_id)?;
    let policies = store
        .policies
        .values()
        .filter(|p| p.tenant_id == tenant_id)
        .cloned()
        .collect();
    Ok(Data(policies))
}

async fn create_policy(
    State(db): State<Db>,
    Path(tenant_id): Path<String>,
    Json(input): Json<CreatePolicy>,
) -> Reply<OidcPolicy> {
    let mut store = db.write().await;
    ensure_tenant(&store, &tenant_id)?;
    let policy = OidcPolicy {
        id: new_id(),
        tenant_id,
        name: input.name,
        provider: input.provider,
        repository: input.repository,
        ref_filter: input.ref_filter.unwrap_or_else(|| "*".to_string()),
        environment_filter: input.environment_filter,
        skill_ids: input.skill_ids,
        enabled: input.enabled,
    };
    store.policies.insert(policy.id.clone(), policy.clone());
    Ok(Data(policy))
}

async fn update_policy(
    State(db): State<Db>,
    Path((tenant_id, policy_id)): Path<(String, String)>,
    Json(input): Json<UpdatePolicy>,
) -> Reply<OidcPolicy> {
    let mut store = db.write().await;
    let policy = store
        .policies
        .get_mut(&policy_id)
        .filter(|p| p.tenant_id == tenant_id)
        .ok_or_else(|| Failure::not_found("policy"))?;
    if let Some(name) = input.name {
        policy.name = name;
    }
    if let Some(repository) = input.repository {
        policy.repository = repository;
    }
    if let Some(ref_filter) = input.ref_filter {
        policy.ref_filter = ref_filter;
    }
    if input.environment_filter.is_some() {
        policy.environment_filter = input.environment_filter;
    }
    if let Some(skill_ids) = input.skill_ids {
        policy.skill_ids = skill_ids;
    }
    if let Some(enabled) = input.enabled {
        policy.enabled = enabled;
    }
    Ok(Data(policy.clone()))
}

async fn delete_policy(
    State(db): State<Db>,
    Path((tenant_id, policy_id)): Path<(String, String)>,
) -> Reply<serde_json::Value> {
    let mut store = db.write().await;
    match store.policies.get(&policy_id) {
        Some(policy) if policy.tenant_id == tenant_id => {
            store.policies.remove(&policy_id);
            Ok(Data(json!({ "deleted": true })))
        }
        _ => Err(Failure::not_found("policy")),
    }
}

// ---------------------------------------------------------------------------
// SSO
// ---------------------------------------------------------------------------

async fn get_sso(State(db): State<Db>, Path(tenant_id): Path<String>) -> Reply<SsoConnection> {
    let store = db.read().await;
    ensure_tenant(&store, &tenant_id)?;
    let connection = store
        .sso
        .get(&tenant_id)
        .cloned()
        .unwrap_or_else(|| SsoConnection::disabled(&tenant_id));
    Ok(Data(connection))
}

async fn update_sso(
    State(db): State<Db>,
    Path(tenant_id): Path<String>,
    Json(input): Json<UpdateSso>,
) -> Reply<SsoConnection> {
    let mut store = db.write().await;
    ensure_tenant(&store, &tenant_id)?;
    let connection = store
        .sso
        .entry(tenant_id.clone())
        .or_insert_with(|| SsoConnection::disabled(&tenant_id));
    if let Some(display_name) = input.display_name {
        connection.display_name = display_name;
    }
    if let Some(metadata_url) = input.metadata_url {
        connection.metadata_url = metadata_url;
    }
    if let Some(default_role) = input.default_role {
        connection.default_role = default_role;
    }
    if let Some(email_domains) = input.email_domains {
        connection.email_domains = email_domains;
    }
    if let Some(enabled) = input.enabled {
        connection.enabled = enabled;
    }
    if let Some(require_sso) = input.require_sso {
        connection.require_sso = require_sso;
    }
    Ok(Data(connection.clone()))
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

async fn get_profile() -> Reply<serde_json::Value> {
    Ok(Data(json!({
        "id": "user-1",
        "username": "mock",
        "name": null,
        "email": "mock@localskills.test",
        "image": null,
        "bio": null,
    })))
}

async fn list_tokens(State(db): State<Db>) -> Reply<Vec<ApiToken>> {
    let store = db.read().await;
    Ok(Data(store.tokens.values().cloned().collect()))
}

async fn create_token(State(db): State<Db>, Json(input): Json<CreateToken>) -> Reply<serde_json::Value> {
    let token = ApiToken {
        id: new_id(),
        name: input.name,
        last_used_at: None,
        created_at: TIMESTAMP.to_string(),
    };
    let secret = format!("{TOKEN_PREFIX}{}", Uuid::new_v4().simple());
    let body = json!({ "id": token.id, "name": token.name, "token": secret });
    db.write().await.tokens.insert(token.id.clone(), token);
    Ok(Data(body))
}

async fn delete_token(State(db): State<Db>, Path(id): Path<String>) -> Reply<serde_json::Value> {
    let mut store = db.write().await;
    store.tokens.remove(&id).ok_or_else(|| Failure::not_found("token"))?;
    Ok(Data(json!({ "deleted": true })))
}
