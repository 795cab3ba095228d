//! # Tenants API Handlers
//!
//! Platform-level management of shops. Every endpoint here requires an
//! operator token.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::types::{ListQuery, rfc3339};
use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::models::{tenant, user};
use crate::repositories::{TenantRepository, UserRepository, tenant::TenantInput, user::NewUser};
use crate::server::AppState;
use crate::tenant::TenantId;
use crate::validation::{ValidatedJson, validate_not_blank, validate_phone};

/// Request payload for creating or updating a tenant
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct TenantRequest {
    /// Display name of the shop (required, max 120 characters)
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    #[schema(example = "Taller A")]
    pub name: String,
    /// Optional domain, unique across tenants
    #[validate(length(max = 255))]
    #[schema(example = "taller-a.example.com")]
    pub domain: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "a@a.com")]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

impl From<TenantRequest> for TenantInput {
    fn from(request: TenantRequest) -> Self {
        Self {
            name: request.name,
            domain: request.domain,
            email: request.email,
            phone: request.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    /// Timestamp when the tenant was created (RFC 3339)
    pub created_at: String,
    pub updated_at: String,
}

impl From<tenant::Model> for TenantResponse {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            domain: model.domain,
            email: model.email,
            phone: model.phone,
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

/// Request payload for provisioning a user inside a tenant
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    pub name: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,
    /// Defaults to `staff`
    pub role: Option<user::Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            email: model.email,
            name: model.name,
            role: model.role,
            created_at: rfc3339(&model.created_at),
        }
    }
}

/// List tenants
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    security(("operator_token" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Tenants ordered by name", body = [TenantResponse]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TenantResponse>>, ApiError> {
    let tenants = TenantRepository::new(&state.db).list(query.page()).await?;
    Ok(Json(tenants.into_iter().map(Into::into).collect()))
}

/// Create a new tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    security(("operator_token" = [])),
    request_body = TenantRequest,
    responses(
        (status = 201, description = "Tenant created successfully", body = TenantResponse, headers(
            ("Location", description = "URL of the created tenant")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "Domain already in use", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    ValidatedJson(request): ValidatedJson<TenantRequest>,
) -> Result<(StatusCode, [(&'static str, String); 1], Json<TenantResponse>), ApiError> {
    let tenant = TenantRepository::new(&state.db).create(request.into()).await?;
    let location = format!("/api/v1/tenants/{}", tenant.id);
    Ok((
        StatusCode::CREATED,
        [("Location", location)],
        Json(tenant.into()),
    ))
}

/// Get one tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    security(("operator_token" = [])),
    params(("id" = Uuid, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Tenant", body = TenantResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = TenantRepository::new(&state.db).get(id).await?;
    Ok(Json(tenant.into()))
}

/// Update a tenant
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}",
    security(("operator_token" = [])),
    params(("id" = Uuid, Path, description = "Tenant identifier")),
    request_body = TenantRequest,
    responses(
        (status = 200, description = "Updated tenant", body = TenantResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 409, description = "Domain already in use", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<TenantRequest>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = TenantRepository::new(&state.db)
        .update(id, request.into())
        .await?;
    Ok(Json(tenant.into()))
}

/// Delete a tenant
///
/// Only tenants that own no records can be deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{id}",
    security(("operator_token" = [])),
    params(("id" = Uuid, Path, description = "Tenant identifier")),
    responses(
        (status = 204, description = "Tenant deleted"),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 409, description = "Tenant still owns records; details carry the counts", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn delete_tenant(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    TenantRepository::new(&state.db).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Provision a user inside a tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{id}/users",
    security(("operator_token" = [])),
    params(("id" = Uuid, Path, description = "Tenant identifier")),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError),
        (status = 409, description = "Email already registered in this tenant", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant_user(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    TenantRepository::new(&state.db).get(id).await?;

    let created = UserRepository::new(&state.db)
        .create(
            TenantId::from(id),
            NewUser {
                email: request.email,
                name: request.name,
                password: request.password,
                role: request.role.unwrap_or(user::Role::Staff),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}
