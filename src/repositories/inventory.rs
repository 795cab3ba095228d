//! # Inventory Repository
//!
//! SKUs are unique per tenant. Stock only ever leaves through a sale (see
//! [`super::sale`]); here it is set directly by create, update and upsert.

use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{Page, now, scoped};
use crate::error::{ServiceError, UniqueField};
use crate::models::inventory_item::{
    self, ActiveModel as InventoryItemActiveModel, InventoryCategory, Model as InventoryItemModel,
};
use crate::tenant::TenantId;

const UNIQUE_FIELDS: &[UniqueField] = &[UniqueField::new(
    "idx_inventory_items_tenant_sku",
    "inventory_items",
    "sku",
)];

#[derive(Debug, Clone)]
pub struct InventoryInput {
    pub sku: String,
    pub name: String,
    pub category: InventoryCategory,
    pub quantity: i32,
    pub unit_price: i64,
    pub min_stock: i32,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub category: Option<InventoryCategory>,
    pub search: Option<String>,
}

pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

impl InventoryInput {
    fn into_active_model(self, id: Option<Uuid>) -> InventoryItemActiveModel {
        let stamp = now();
        InventoryItemActiveModel {
            id: id.map(Set).unwrap_or(NotSet),
            tenant_id: NotSet,
            sku: Set(normalize_sku(&self.sku)),
            name: Set(self.name.trim().to_string()),
            category: Set(self.category.as_str().to_string()),
            quantity: Set(self.quantity),
            unit_price: Set(self.unit_price),
            min_stock: Set(self.min_stock),
            created_at: if id.is_some() { Set(stamp) } else { NotSet },
            updated_at: Set(stamp),
        }
    }
}

pub struct InventoryRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> InventoryRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant: TenantId,
        filter: InventoryFilter,
        page: Page,
    ) -> Result<Vec<InventoryItemModel>, ServiceError> {
        let mut query = scoped::scoped::<inventory_item::Entity>(tenant);
        if let Some(category) = filter.category {
            query = query.filter(inventory_item::Column::Category.eq(category.as_str()));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(inventory_item::Column::Name.contains(term))
                    .add(inventory_item::Column::Sku.contains(normalize_sku(term))),
            );
        }
        Ok(query
            .order_by_asc(inventory_item::Column::Sku)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    /// Items at or below their minimum stock level, scarcest first.
    pub async fn low_stock(&self, tenant: TenantId) -> Result<Vec<InventoryItemModel>, ServiceError> {
        Ok(scoped::scoped::<inventory_item::Entity>(tenant)
            .filter(
                Expr::col(inventory_item::Column::Quantity)
                    .lte(Expr::col(inventory_item::Column::MinStock)),
            )
            .order_by_asc(inventory_item::Column::Quantity)
            .order_by_asc(inventory_item::Column::Sku)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<InventoryItemModel, ServiceError> {
        scoped::find_one::<inventory_item::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Inventory item", id))
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        input: InventoryInput,
    ) -> Result<InventoryItemModel, ServiceError> {
        scoped::insert(self.db, tenant, input.into_active_model(Some(Uuid::new_v4())))
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        id: Uuid,
        input: InventoryInput,
    ) -> Result<InventoryItemModel, ServiceError> {
        scoped::update(self.db, tenant, id, input.into_active_model(None))
            .await
            .map_err(|e| ServiceError::from_write(e, UNIQUE_FIELDS))?
            .ok_or_else(|| ServiceError::not_found("Inventory item", id))
    }

    /// Items that appear on a sale cannot be deleted.
    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let removed = scoped::delete::<inventory_item::Entity, _>(self.db, tenant, id)
            .await
            .map_err(|e| ServiceError::from_write(e, &[]))?;
        if !removed {
            return Err(ServiceError::not_found("Inventory item", id));
        }
        Ok(())
    }
}

impl<'a, C: ConnectionTrait + TransactionTrait> InventoryRepository<'a, C> {
    /// Create or replace the tenant's item with `sku`. Returns the item and
    /// whether it was newly created.
    pub async fn upsert_by_sku(
        &self,
        tenant: TenantId,
        sku: &str,
        mut input: InventoryInput,
    ) -> Result<(InventoryItemModel, bool), ServiceError> {
        let sku = normalize_sku(sku);
        input.sku = sku.clone();
        let matching = Condition::all().add(inventory_item::Column::Sku.eq(sku.as_str()));

        let txn = self.db.begin().await?;

        let existed = scoped::scoped::<inventory_item::Entity>(tenant)
            .filter(matching.clone())
            .one(&txn)
            .await?
            .is_some();

        let insert_model = input.clone().into_active_model(Some(Uuid::new_v4()));
        let update_model = input.into_active_model(None);
        let item = match scoped::upsert(&txn, tenant, matching, insert_model, update_model).await {
            Ok(item) => item,
            Err(e) => {
                txn.rollback().await?;
                return Err(ServiceError::from_write(e, UNIQUE_FIELDS));
            }
        };

        txn.commit().await?;
        Ok((item, !existed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_is_trimmed_and_upper_cased() {
        assert_eq!(normalize_sku("  fil-aceite-01 "), "FIL-ACEITE-01");
    }
}
