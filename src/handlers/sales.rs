//! # Sales API Handlers
//!
//! Sales are immutable once recorded: there is no update endpoint, and
//! deleting a sale does not put stock back.

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
use crate::error::{ApiError, ServiceError};
use crate::models::{customer, sale, sale_item};
use crate::notifications::{self, Notification};
use crate::repositories::{
    CustomerRepository, MotorcycleRepository, Page, SaleRepository, WorkOrderRepository,
    sale::{NewSale, SaleLine, SaleWithItems},
};
use crate::server::AppState;
use crate::tenant::TenantId;
use crate::validation::ValidatedJson;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleLineRequest {
    pub inventory_item_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaleRequest {
    /// Bill a work order; omit for a counter sale
    pub work_order_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    /// Defaults to `efectivo`
    #[validate(length(max = 40))]
    #[schema(example = "tarjeta")]
    pub payment_method: Option<String>,
    #[validate(length(min = 1, message = "A sale needs at least one item"))]
    pub items: Vec<SaleLineRequest>,
}

impl From<SaleRequest> for NewSale {
    fn from(request: SaleRequest) -> Self {
        Self {
            work_order_id: request.work_order_id,
            customer_id: request.customer_id,
            payment_method: request.payment_method,
            lines: request
                .items
                .into_iter()
                .map(|line| SaleLine {
                    inventory_item_id: line.inventory_item_id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleItemResponse {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub quantity: i32,
    /// Price at the time of sale
    pub unit_price: i64,
    pub subtotal: i64,
}

impl From<sale_item::Model> for SaleItemResponse {
    fn from(model: sale_item::Model) -> Self {
        Self {
            id: model.id,
            inventory_item_id: model.inventory_item_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            subtotal: model.subtotal,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleSummary {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub work_order_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    /// `service` or `counter`
    pub kind: String,
    pub payment_method: String,
    pub total: i64,
    pub created_at: String,
}

impl From<sale::Model> for SaleSummary {
    fn from(model: sale::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            work_order_id: model.work_order_id,
            customer_id: model.customer_id,
            kind: model.kind,
            payment_method: model.payment_method,
            total: model.total,
            created_at: rfc3339(&model.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub sale: SaleSummary,
    pub items: Vec<SaleItemResponse>,
}

impl From<SaleWithItems> for SaleResponse {
    fn from(value: SaleWithItems) -> Self {
        Self {
            sale: value.sale.into(),
            items: value.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSalesQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// List sales
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListSalesQuery),
    responses(
        (status = 200, description = "Sales, newest first, without items", body = [SaleSummary]),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListSalesQuery>,
) -> Result<Json<Vec<SaleSummary>>, ApiError> {
    let sales = SaleRepository::new(&state.db)
        .list(ctx.tenant, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(sales.into_iter().map(Into::into).collect()))
}

/// Get one sale with its items
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Sale identifier")),
    responses(
        (status = 200, description = "Sale", body = SaleResponse),
        (status = 404, description = "Sale not found", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale = SaleRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(sale.into()))
}

/// Record a sale
///
/// Stock for every line is decremented atomically. If any line lacks
/// stock nothing is recorded.
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = SaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = SaleResponse),
        (status = 400, description = "Validation failed or unknown reference", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError),
        (status = 409, description = "Insufficient stock", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<SaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let created = SaleRepository::new(&state.db)
        .create(session.tenant, request.into())
        .await?;

    notify_sale(&state, session.tenant, &created.sale).await;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Delete a sale
#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Sale identifier")),
    responses(
        (status = 204, description = "Sale deleted"),
        (status = 404, description = "Sale not found", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    SaleRepository::new(&state.db).delete(session.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The sale's customer, or the owner of the billed work order's motorcycle.
async fn sale_customer(
    state: &AppState,
    tenant: TenantId,
    sale: &sale::Model,
) -> Result<Option<customer::Model>, ServiceError> {
    let customers = CustomerRepository::new(&state.db);
    if let Some(customer_id) = sale.customer_id {
        return customers.get(tenant, customer_id).await.map(Some);
    }
    let Some(work_order_id) = sale.work_order_id else {
        return Ok(None);
    };
    let order = WorkOrderRepository::new(&state.db)
        .get(tenant, work_order_id)
        .await?;
    let motorcycle = MotorcycleRepository::new(&state.db)
        .get(tenant, order.motorcycle_id)
        .await?;
    customers.get(tenant, motorcycle.customer_id).await.map(Some)
}

async fn notify_sale(state: &AppState, tenant: TenantId, sale: &sale::Model) {
    match sale_customer(state, tenant, sale).await {
        Ok(Some(customer::Model {
            phone: Some(phone),
            name,
            ..
        })) => notifications::dispatch(
            state.notifier.clone(),
            Notification::SaleRecorded {
                phone,
                customer_name: name,
                sale_id: sale.id,
                total: sale.total,
            },
        ),
        Ok(_) => tracing::debug!(sale_id = %sale.id, "No customer phone for sale; skipping notification"),
        Err(err) => tracing::warn!(
            sale_id = %sale.id,
            error = %err,
            "Could not look up customer for notification"
        ),
    }
}
