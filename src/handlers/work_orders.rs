//! # Work Orders API Handlers
//!
//! Work orders move through Diagnosticando, Reparado and Entregado. Status
//! changes go through their own endpoint so each transition stamps its
//! timestamp exactly once, and customers are messaged when their motorcycle
//! is repaired or delivered.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::types::{rfc3339, rfc3339_opt};
use crate::auth::{ReadContext, SessionContext};
use crate::error::{ApiError, ServiceError};
use crate::models::work_order::{self, WorkOrderStatus};
use crate::notifications::{self, Notification};
use crate::repositories::{
    CustomerRepository, MotorcycleRepository, Page, WorkOrderRepository,
    work_order::{WorkOrderFilter, WorkOrderInput},
};
use crate::server::AppState;
use crate::tenant::TenantId;
use crate::validation::{ValidatedJson, validate_not_blank, validate_work_order_status};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct WorkOrderRequest {
    pub motorcycle_id: Uuid,
    /// Must be active when first assigned
    pub technician_id: Uuid,
    #[validate(custom(function = "validate_not_blank"), length(max = 2000))]
    #[schema(example = "Ruido en la transmisión")]
    pub description: String,
    #[validate(length(max = 2000))]
    pub diagnosis: Option<String>,
    /// Minor currency units; defaults to 0
    #[validate(range(min = 0, message = "Labor cost cannot be negative"))]
    pub labor_cost: Option<i64>,
}

impl From<WorkOrderRequest> for WorkOrderInput {
    fn from(request: WorkOrderRequest) -> Self {
        Self {
            motorcycle_id: request.motorcycle_id,
            technician_id: request.technician_id,
            description: request.description,
            diagnosis: request.diagnosis,
            labor_cost: request.labor_cost.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct StatusRequest {
    #[validate(custom(function = "validate_work_order_status"))]
    #[schema(example = "Reparado")]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub motorcycle_id: Uuid,
    pub technician_id: Uuid,
    pub description: String,
    pub diagnosis: Option<String>,
    pub labor_cost: i64,
    pub status: String,
    pub diagnosed_at: Option<String>,
    pub repaired_at: Option<String>,
    pub delivered_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<work_order::Model> for WorkOrderResponse {
    fn from(model: work_order::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            motorcycle_id: model.motorcycle_id,
            technician_id: model.technician_id,
            description: model.description,
            diagnosis: model.diagnosis,
            labor_cost: model.labor_cost,
            status: model.status,
            diagnosed_at: rfc3339_opt(&model.diagnosed_at),
            repaired_at: rfc3339_opt(&model.repaired_at),
            delivered_at: rfc3339_opt(&model.delivered_at),
            completed_at: rfc3339_opt(&model.completed_at),
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusChangeResponse {
    pub work_order: WorkOrderResponse,
    /// `false` when the order already had the requested status
    pub changed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListWorkOrdersQuery {
    pub status: Option<String>,
    pub technician_id: Option<Uuid>,
    pub motorcycle_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn parse_status(value: &str) -> Result<WorkOrderStatus, ServiceError> {
    value
        .parse()
        .map_err(|err: String| ServiceError::field("status", err))
}

/// List work orders
#[utoipa::path(
    get,
    path = "/api/v1/work-orders",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListWorkOrdersQuery),
    responses(
        (status = 200, description = "Work orders, newest first", body = [WorkOrderResponse]),
        (status = 400, description = "Unknown status", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "work-orders"
)]
pub async fn list_work_orders(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListWorkOrdersQuery>,
) -> Result<Json<Vec<WorkOrderResponse>>, ApiError> {
    let filter = WorkOrderFilter {
        status: query.status.as_deref().map(parse_status).transpose()?,
        technician_id: query.technician_id,
        motorcycle_id: query.motorcycle_id,
    };
    let orders = WorkOrderRepository::new(&state.db)
        .list(ctx.tenant, filter, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// Get one work order
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Work order identifier")),
    responses(
        (status = 200, description = "Work order", body = WorkOrderResponse),
        (status = 404, description = "Work order not found", body = ApiError)
    ),
    tag = "work-orders"
)]
pub async fn get_work_order(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkOrderResponse>, ApiError> {
    let order = WorkOrderRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(order.into()))
}

/// Open a work order
///
/// New orders start in Diagnosticando.
#[utoipa::path(
    post,
    path = "/api/v1/work-orders",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = WorkOrderRequest,
    responses(
        (status = 201, description = "Work order opened", body = WorkOrderResponse),
        (status = 400, description = "Validation failed, unknown reference or inactive technician", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "work-orders"
)]
pub async fn create_work_order(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<WorkOrderRequest>,
) -> Result<(StatusCode, Json<WorkOrderResponse>), ApiError> {
    let order = WorkOrderRepository::new(&state.db)
        .create(session.tenant, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Update a work order's details
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Work order identifier")),
    request_body = WorkOrderRequest,
    responses(
        (status = 200, description = "Updated work order", body = WorkOrderResponse),
        (status = 400, description = "Validation failed or unknown reference", body = ApiError),
        (status = 404, description = "Work order not found", body = ApiError)
    ),
    tag = "work-orders"
)]
pub async fn update_work_order(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<WorkOrderRequest>,
) -> Result<Json<WorkOrderResponse>, ApiError> {
    let order = WorkOrderRepository::new(&state.db)
        .update(session.tenant, id, request.into())
        .await?;
    Ok(Json(order.into()))
}

/// Change a work order's status
///
/// Setting the current status again is a no-op and keeps the original
/// timestamps.
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/status",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Work order identifier")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status applied", body = StatusChangeResponse),
        (status = 400, description = "Unknown status", body = ApiError),
        (status = 404, description = "Work order not found", body = ApiError),
        (status = 409, description = "Transition not allowed", body = ApiError)
    ),
    tag = "work-orders"
)]
pub async fn set_work_order_status(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<StatusRequest>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let next = parse_status(&request.status)?;
    let change = WorkOrderRepository::new(&state.db)
        .set_status(session.tenant, id, next, state.config.enforce_status_order)
        .await?;

    if change.changed && notifications::notifies_customer(next) {
        notify_status_change(&state, session.tenant, &change.order, next).await;
    }

    Ok(Json(StatusChangeResponse {
        work_order: change.order.into(),
        changed: change.changed,
    }))
}

/// Delete a work order
#[utoipa::path(
    delete,
    path = "/api/v1/work-orders/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Work order identifier")),
    responses(
        (status = 204, description = "Work order deleted"),
        (status = 404, description = "Work order not found", body = ApiError)
    ),
    tag = "work-orders"
)]
pub async fn delete_work_order(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    WorkOrderRepository::new(&state.db)
        .delete(session.tenant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn notify_status_change(
    state: &AppState,
    tenant: TenantId,
    order: &work_order::Model,
    status: WorkOrderStatus,
) {
    let lookup = async {
        let motorcycle = MotorcycleRepository::new(&state.db)
            .get(tenant, order.motorcycle_id)
            .await?;
        let customer = CustomerRepository::new(&state.db)
            .get(tenant, motorcycle.customer_id)
            .await?;
        Ok::<_, ServiceError>((motorcycle, customer))
    };

    match lookup.await {
        Ok((motorcycle, customer)) => match customer.phone {
            Some(phone) => notifications::dispatch(
                state.notifier.clone(),
                Notification::WorkOrderStatusChanged {
                    phone,
                    customer_name: customer.name,
                    work_order_id: order.id,
                    plate: motorcycle.plate,
                    status,
                },
            ),
            None => tracing::debug!(
                work_order_id = %order.id,
                "Customer has no phone; skipping notification"
            ),
        },
        Err(err) => tracing::warn!(
            work_order_id = %order.id,
            error = %err,
            "Could not look up customer for notification"
        ),
    }
}
