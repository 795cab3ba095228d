//! # Motorcycles API Handlers

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
use crate::models::motorcycle;
use crate::repositories::{MotorcycleRepository, Page, motorcycle::MotorcycleInput};
use crate::server::AppState;
use crate::validation::{ValidatedJson, validate_not_blank, validate_plate};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct MotorcycleRequest {
    /// Owner; must be a customer of the same shop
    pub customer_id: Uuid,
    /// Stored upper-cased without spaces
    #[validate(custom(function = "validate_plate"))]
    #[schema(example = "ABC12D")]
    pub plate: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 60))]
    #[schema(example = "Yamaha")]
    pub brand: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 60))]
    #[schema(example = "FZ 2.0")]
    pub model: String,
    #[validate(range(min = 1900, max = 2100, message = "Year must be between 1900 and 2100"))]
    pub year: Option<i32>,
    #[validate(length(max = 40))]
    pub color: Option<String>,
    #[validate(range(min = 0, message = "Mileage cannot be negative"))]
    pub mileage: Option<i32>,
}

impl From<MotorcycleRequest> for MotorcycleInput {
    fn from(request: MotorcycleRequest) -> Self {
        Self {
            customer_id: request.customer_id,
            plate: request.plate,
            brand: request.brand,
            model: request.model,
            year: request.year,
            color: request.color,
            mileage: request.mileage,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MotorcycleResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub mileage: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<motorcycle::Model> for MotorcycleResponse {
    fn from(model: motorcycle::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            customer_id: model.customer_id,
            plate: model.plate,
            brand: model.brand,
            model: model.model,
            year: model.year,
            color: model.color,
            mileage: model.mileage,
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMotorcyclesQuery {
    /// Only motorcycles of this customer
    pub customer_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// List motorcycles
#[utoipa::path(
    get,
    path = "/api/v1/motorcycles",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListMotorcyclesQuery),
    responses(
        (status = 200, description = "Motorcycles ordered by plate", body = [MotorcycleResponse]),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "motorcycles"
)]
pub async fn list_motorcycles(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListMotorcyclesQuery>,
) -> Result<Json<Vec<MotorcycleResponse>>, ApiError> {
    let motorcycles = MotorcycleRepository::new(&state.db)
        .list(ctx.tenant, query.customer_id, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(motorcycles.into_iter().map(Into::into).collect()))
}

/// Get one motorcycle
#[utoipa::path(
    get,
    path = "/api/v1/motorcycles/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Motorcycle identifier")),
    responses(
        (status = 200, description = "Motorcycle", body = MotorcycleResponse),
        (status = 404, description = "Motorcycle not found", body = ApiError)
    ),
    tag = "motorcycles"
)]
pub async fn get_motorcycle(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<MotorcycleResponse>, ApiError> {
    let motorcycle = MotorcycleRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(motorcycle.into()))
}

/// Register a motorcycle
#[utoipa::path(
    post,
    path = "/api/v1/motorcycles",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = MotorcycleRequest,
    responses(
        (status = 201, description = "Motorcycle registered", body = MotorcycleResponse),
        (status = 400, description = "Validation failed or unknown customer", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError),
        (status = 409, description = "Plate already registered", body = ApiError)
    ),
    tag = "motorcycles"
)]
pub async fn create_motorcycle(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<MotorcycleRequest>,
) -> Result<(StatusCode, Json<MotorcycleResponse>), ApiError> {
    let motorcycle = MotorcycleRepository::new(&state.db)
        .create(session.tenant, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(motorcycle.into())))
}

/// Update a motorcycle
#[utoipa::path(
    put,
    path = "/api/v1/motorcycles/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Motorcycle identifier")),
    request_body = MotorcycleRequest,
    responses(
        (status = 200, description = "Updated motorcycle", body = MotorcycleResponse),
        (status = 400, description = "Validation failed or unknown customer", body = ApiError),
        (status = 404, description = "Motorcycle not found", body = ApiError),
        (status = 409, description = "Plate already registered", body = ApiError)
    ),
    tag = "motorcycles"
)]
pub async fn update_motorcycle(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<MotorcycleRequest>,
) -> Result<Json<MotorcycleResponse>, ApiError> {
    let motorcycle = MotorcycleRepository::new(&state.db)
        .update(session.tenant, id, request.into())
        .await?;
    Ok(Json(motorcycle.into()))
}

/// Delete a motorcycle
#[utoipa::path(
    delete,
    path = "/api/v1/motorcycles/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Motorcycle identifier")),
    responses(
        (status = 204, description = "Motorcycle deleted"),
        (status = 404, description = "Motorcycle not found", body = ApiError)
    ),
    tag = "motorcycles"
)]
pub async fn delete_motorcycle(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    MotorcycleRepository::new(&state.db)
        .delete(session.tenant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
