//! # Inventory API Handlers

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
use crate::models::inventory_item::{self, InventoryCategory};
use crate::repositories::{
    InventoryRepository, Page,
    inventory::{InventoryFilter, InventoryInput},
};
use crate::server::AppState;
use crate::validation::{ValidatedJson, validate_category, validate_not_blank};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct InventoryRequest {
    /// Stock keeping unit, unique per shop (stored upper-cased)
    #[validate(custom(function = "validate_not_blank"), length(max = 64))]
    #[schema(example = "FIL-ACEITE-01")]
    pub sku: String,
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    #[schema(example = "Filtro de aceite")]
    pub name: String,
    /// One of repuesto, accesorio, lubricante, llanta, herramienta, otro
    #[validate(custom(function = "validate_category"))]
    #[schema(example = "repuesto")]
    pub category: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    /// Price in minor currency units
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub unit_price: i64,
    #[validate(range(min = 0, message = "Minimum stock cannot be negative"))]
    pub min_stock: Option<i32>,
}

/// Body of `PUT /inventory/sku/{sku}`; the SKU comes from the path.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct InventoryUpsertRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 120))]
    pub name: String,
    #[validate(custom(function = "validate_category"))]
    pub category: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub unit_price: i64,
    #[validate(range(min = 0, message = "Minimum stock cannot be negative"))]
    pub min_stock: Option<i32>,
}

fn parse_category(value: &str) -> Result<InventoryCategory, ServiceError> {
    value
        .parse()
        .map_err(|err: String| ServiceError::field("category", err))
}

impl TryFrom<InventoryRequest> for InventoryInput {
    type Error = ServiceError;

    fn try_from(request: InventoryRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            category: parse_category(&request.category)?,
            sku: request.sku,
            name: request.name,
            quantity: request.quantity,
            unit_price: request.unit_price,
            min_stock: request.min_stock.unwrap_or(0),
        })
    }
}

impl InventoryUpsertRequest {
    fn into_input(self, sku: String) -> Result<InventoryInput, ServiceError> {
        Ok(InventoryInput {
            category: parse_category(&self.category)?,
            sku,
            name: self.name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            min_stock: self.min_stock.unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryItemResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub min_stock: i32,
    /// `quantity <= min_stock`
    pub low_stock: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<inventory_item::Model> for InventoryItemResponse {
    fn from(model: inventory_item::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            low_stock: model.quantity <= model.min_stock,
            sku: model.sku,
            name: model.name,
            category: model.category,
            quantity: model.quantity,
            unit_price: model.unit_price,
            min_stock: model.min_stock,
            created_at: rfc3339(&model.created_at),
            updated_at: rfc3339(&model.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListInventoryQuery {
    pub category: Option<String>,
    /// Matches name or SKU
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// List inventory items
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(ListInventoryQuery),
    responses(
        (status = 200, description = "Items ordered by SKU", body = [InventoryItemResponse]),
        (status = 400, description = "Unknown category", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    ctx: ReadContext,
    Query(query): Query<ListInventoryQuery>,
) -> Result<Json<Vec<InventoryItemResponse>>, ApiError> {
    let filter = InventoryFilter {
        category: query.category.as_deref().map(parse_category).transpose()?,
        search: query.search,
    };
    let items = InventoryRepository::new(&state.db)
        .list(ctx.tenant, filter, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Items at or below their minimum stock
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    responses(
        (status = 200, description = "Items to restock, scarcest first", body = [InventoryItemResponse]),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    ctx: ReadContext,
) -> Result<Json<Vec<InventoryItemResponse>>, ApiError> {
    let items = InventoryRepository::new(&state.db).low_stock(ctx.tenant).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Get one inventory item
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Inventory item identifier")),
    responses(
        (status = 200, description = "Inventory item", body = InventoryItemResponse),
        (status = 404, description = "Inventory item not found", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn get_inventory_item(
    State(state): State<AppState>,
    ctx: ReadContext,
    Path(id): Path<Uuid>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    let item = InventoryRepository::new(&state.db).get(ctx.tenant, id).await?;
    Ok(Json(item.into()))
}

/// Add an inventory item
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    request_body = InventoryRequest,
    responses(
        (status = 201, description = "Item added", body = InventoryItemResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError),
        (status = 409, description = "SKU already exists", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(request): ValidatedJson<InventoryRequest>,
) -> Result<(StatusCode, Json<InventoryItemResponse>), ApiError> {
    let item = InventoryRepository::new(&state.db)
        .create(session.tenant, request.try_into()?)
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Update an inventory item
#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Inventory item identifier")),
    request_body = InventoryRequest,
    responses(
        (status = 200, description = "Updated item", body = InventoryItemResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Inventory item not found", body = ApiError),
        (status = 409, description = "SKU already exists", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<InventoryRequest>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    let item = InventoryRepository::new(&state.db)
        .update(session.tenant, id, request.try_into()?)
        .await?;
    Ok(Json(item.into()))
}

/// Create or replace the item with a SKU
#[utoipa::path(
    put,
    path = "/api/v1/inventory/sku/{sku}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("sku" = String, Path, description = "Stock keeping unit")),
    request_body = InventoryUpsertRequest,
    responses(
        (status = 201, description = "Item created", body = InventoryItemResponse),
        (status = 200, description = "Item replaced", body = InventoryItemResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Authentication required", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn upsert_inventory_item(
    State(state): State<AppState>,
    session: SessionContext,
    Path(sku): Path<String>,
    ValidatedJson(request): ValidatedJson<InventoryUpsertRequest>,
) -> Result<(StatusCode, Json<InventoryItemResponse>), ApiError> {
    if sku.trim().is_empty() || sku.trim().len() > 64 {
        return Err(ServiceError::field("sku", "SKU must be 1 to 64 characters").into());
    }

    let input = request.into_input(sku.clone())?;
    let (item, created) = InventoryRepository::new(&state.db)
        .upsert_by_sku(session.tenant, &sku, input)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(item.into())))
}

/// Delete an inventory item
#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    security(("bearer_auth" = []), ("session_cookie" = [])),
    params(("id" = Uuid, Path, description = "Inventory item identifier")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Inventory item not found", body = ApiError),
        (status = 409, description = "Item appears on a sale", body = ApiError)
    ),
    tag = "inventory"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    InventoryRepository::new(&state.db)
        .delete(session.tenant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
