//! # Technicians API Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::types::rfc3339;
use crate::auth::{ReadContext, SessionContext};
use crate::error::ApiError;
use crate::models::technician;
use crate::repositories::{Page, TechnicianRepository, technician::TechnicianInput};
use crate::server::AppState;
use crate::validation::{ValidatedJson, validate_not_blank, validate_phone};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct TechnicianRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    #[schema(example = "Carlos Ruiz")]
    pub name: String,
    #[validate(length(max = 80))]
    #[schema(example = "Motores")]
    pub specialty: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    /// Defaults to `true`
    pub active: Option<bool>,
}

impl From<TechnicianRequest> for TechnicianInput {
    fn from(request: TechnicianRequest) -> Self {
        Self {
            name: request.name,
            specialty: request.specialty,
            phone: request.phone,
            active: request.active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TechnicianResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<technician::Model> for TechnicianResponse {
    fn from(model: technician::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            name: model.name,
            specialty: model.specialty,
            phone: model.phone,
            active: model.active,
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTechniciansQuery {
    /// Only active technicians
    pub active_only: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// List technicians
#[utoipa::path(
    get,
    path = "/api/v1/technicians",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListTechniciansQuery),
    responses(
        (status = 200, description = "Technicians ordered by name", body = [TechnicianResponse]),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "technicians"
)]
pub async fn list_technicians(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListTechniciansQuery>,
) -> Result<Json<Vec<TechnicianResponse>>, ApiError> {
    let technicians = TechnicianRepository::new(&state.db)
        .list(
            ctx.tenant,
            query.active_only.unwrap_or(false),
            Page::new(query.limit, query.offset),
        )
        .await?;
    Ok(Json(technicians.into_iter().map(Into::into).collect()))
}

/// Get one technician
#[utoipa::path(
    get,
    path = "/api/v1/technicians/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Technician identifier")),
    responses(
        (status = 200, description = "Technician", body = TechnicianResponse),
        (status = 404, description = "Technician not found", body = ApiError)
    ),
    tag = "technicians"
)]
pub async fn get_technician(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<TechnicianResponse>, ApiError> {
    let technician = TechnicianRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(technician.into()))
}

/// Add a technician
#[utoipa::path(
    post,
    path = "/api/v1/technicians",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = TechnicianRequest,
    responses(
        (status = 201, description = "Technician added", body = TechnicianResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "technicians"
)]
pub async fn create_technician(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<TechnicianRequest>,
) -> Result<(StatusCode, Json<TechnicianResponse>), ApiError> {
    let technician = TechnicianRepository::new(&state.db)
        .create(session.tenant, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(technician.into())))
}

/// Update a technician
#[utoipa::path(
    put,
    path = "/api/v1/technicians/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Technician identifier")),
    request_body = TechnicianRequest,
    responses(
        (status = 200, description = "Updated technician", body = TechnicianResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Technician not found", body = ApiError)
    ),
    tag = "technicians"
)]
pub async fn update_technician(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<TechnicianRequest>,
) -> Result<Json<TechnicianResponse>, ApiError> {
    let technician = TechnicianRepository::new(&state.db)
        .update(session.tenant, id, request.into())
        .await?;
    Ok(Json(technician.into()))
}

/// Delete a technician
#[utoipa::path(
    delete,
    path = "/api/v1/technicians/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Technician identifier")),
    responses(
        (status = 204, description = "Technician deleted"),
        (status = 404, description = "Technician not found", body = ApiError),
        (status = 409, description = "Technician has work orders", body = ApiError)
    ),
    tag = "technicians"
)]
pub async fn delete_technician(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    TechnicianRepository::new(&state.db)
        .delete(session.tenant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
