//! # Customers API Handlers

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
use crate::models::customer;
use crate::repositories::{CustomerRepository, Page, customer::CustomerInput};
use crate::server::AppState;
use crate::validation::{ValidatedJson, validate_not_blank, validate_phone};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    #[schema(example = "Ana Gómez")]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "ana@example.com")]
    pub email: String,
    /// National id number, unique per shop
    #[validate(custom(function = "validate_not_blank"), length(max = 20))]
    #[schema(example = "1020304050")]
    pub cedula: String,
    #[validate(custom(function = "validate_phone"))]
    #[schema(example = "+57 300 123 4567")]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

impl From<CustomerRequest> for CustomerInput {
    fn from(request: CustomerRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            cedula: request.cedula,
            phone: request.phone,
            address: request.address,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub cedula: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<customer::Model> for CustomerResponse {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            name: model.name,
            email: model.email,
            cedula: model.cedula,
            phone: model.phone,
            address: model.address,
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCustomersQuery {
    /// Matches name, email or cedula
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// List customers
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Customers ordered by name", body = [CustomerResponse]),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<Vec<CustomerResponse>>, ApiError> {
    let customers = CustomerRepository::new(&state.db)
        .list(
            ctx.tenant,
            query.search.as_deref(),
            Page::new(query.limit, query.offset),
        )
        .await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// Get one customer
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Customer identifier")),
    responses(
        (status = 200, description = "Customer", body = CustomerResponse),
        (status = 404, description = "Customer not found", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer = CustomerRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(customer.into()))
}

/// Create a customer
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = CustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError),
        (status = 409, description = "Email or cedula already registered", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<CustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let customer = CustomerRepository::new(&state.db)
        .create(session.tenant, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// Update a customer
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Customer identifier")),
    request_body = CustomerRequest,
    responses(
        (status = 200, description = "Updated customer", body = CustomerResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Customer not found", body = ApiError),
        (status = 409, description = "Email or cedula already registered", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CustomerRequest>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer = CustomerRepository::new(&state.db)
        .update(session.tenant, id, request.into())
        .await?;
    Ok(Json(customer.into()))
}

/// Delete a customer
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Customer identifier")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found", body = ApiError),
        (status = 409, description = "Customer is still referenced", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    CustomerRepository::new(&state.db)
        .delete(session.tenant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
