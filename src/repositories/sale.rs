//! # Sale Repository
//!
//! A sale consumes inventory. Creating one runs in a single transaction:
//! every line is checked against stock and decremented with a guarded
//! `UPDATE ... WHERE quantity >= n`, the unit price is frozen onto the sale
//! item, and the sale total is the sum of the line subtotals. If any line
//! fails the whole sale rolls back and no stock moves.

use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{Page, now, scoped};
use crate::error::ServiceError;
use crate::models::{
    customer, inventory_item,
    sale::{self, Model as SaleModel, SaleKind},
    sale_item::{self, Model as SaleItemModel},
    work_order,
};
use crate::tenant::TenantId;

pub const DEFAULT_PAYMENT_METHOD: &str = "efectivo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleLine {
    pub inventory_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    /// Set for service sales
    pub work_order_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub lines: Vec<SaleLine>,
}

/// A sale with its line items
#[derive(Debug, Clone)]
pub struct SaleWithItems {
    pub sale: SaleModel,
    pub items: Vec<SaleItemModel>,
}

/// Merge repeated lines for the same item, keeping first-seen order.
pub fn merge_lines(lines: &[SaleLine]) -> Result<Vec<SaleLine>, ServiceError> {
    let mut merged: Vec<SaleLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged
            .iter_mut()
            .find(|existing| existing.inventory_item_id == line.inventory_item_id)
        {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| ServiceError::field("items", "Quantity is too large"))?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

pub struct SaleRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SaleRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Newest first.
    pub async fn list(&self, tenant: TenantId, page: Page) -> Result<Vec<SaleModel>, ServiceError> {
        Ok(scoped::scoped::<sale::Entity>(tenant)
            .order_by_desc(sale::Column::CreatedAt)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db)
            .await?)
    }

    pub async fn get(&self, tenant: TenantId, id: Uuid) -> Result<SaleWithItems, ServiceError> {
        let sale = scoped::find_one::<sale::Entity, _>(self.db, tenant, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", id))?;
        let items = scoped::scoped::<sale_item::Entity>(tenant)
            .filter(sale_item::Column::SaleId.eq(id))
            .all(self.db)
            .await?;
        Ok(SaleWithItems { sale, items })
    }
}

impl<'a, C: ConnectionTrait + TransactionTrait> SaleRepository<'a, C> {
    pub async fn create(&self, tenant: TenantId, input: NewSale) -> Result<SaleWithItems, ServiceError> {
        if input.lines.is_empty() {
            return Err(ServiceError::field("items", "A sale needs at least one item"));
        }
        if input.lines.iter().any(|line| line.quantity <= 0) {
            return Err(ServiceError::field("items", "Quantities must be positive"));
        }

        let txn = self.db.begin().await?;
        match record_sale(&txn, tenant, input).await {
            Ok(created) => {
                txn.commit().await?;
                tracing::info!(
                    sale_id = %created.sale.id,
                    kind = %created.sale.kind,
                    total = created.sale.total,
                    lines = created.items.len(),
                    "Sale recorded"
                );
                Ok(created)
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        }
    }

    /// Delete a sale and its items. Stock is not restored.
    pub async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        if scoped::find_one::<sale::Entity, _>(&txn, tenant, id).await?.is_none() {
            txn.rollback().await?;
            return Err(ServiceError::not_found("Sale", id));
        }

        sale_item::Entity::delete_many()
            .filter(sale_item::Column::SaleId.eq(id))
            .filter(sale_item::Column::TenantId.eq(tenant))
            .exec(&txn)
            .await?;
        scoped::delete::<sale::Entity, _>(&txn, tenant, id).await?;

        txn.commit().await?;
        Ok(())
    }
}

async fn record_sale(
    txn: &DatabaseTransaction,
    tenant: TenantId,
    input: NewSale,
) -> Result<SaleWithItems, ServiceError> {
    if let Some(work_order_id) = input.work_order_id
        && scoped::find_one::<work_order::Entity, _>(txn, tenant, work_order_id)
            .await?
            .is_none()
    {
        return Err(ServiceError::field("work_order_id", "Work order not found"));
    }
    if let Some(customer_id) = input.customer_id
        && scoped::find_one::<customer::Entity, _>(txn, tenant, customer_id)
            .await?
            .is_none()
    {
        return Err(ServiceError::field("customer_id", "Customer not found"));
    }

    let stamp = now();
    let mut priced = Vec::new();
    let mut total: i64 = 0;

    for line in merge_lines(&input.lines)? {
        let item = scoped::find_one::<inventory_item::Entity, _>(txn, tenant, line.inventory_item_id)
            .await?
            .ok_or_else(|| {
                ServiceError::field(
                    "items",
                    format!("Inventory item {} not found", line.inventory_item_id),
                )
            })?;

        let insufficient = |available: i32| ServiceError::InsufficientStock {
            item_id: item.id,
            sku: item.sku.clone(),
            requested: line.quantity,
            available,
        };

        if item.quantity < line.quantity {
            return Err(insufficient(item.quantity));
        }

        let decremented = inventory_item::Entity::update_many()
            .col_expr(
                inventory_item::Column::Quantity,
                Expr::col(inventory_item::Column::Quantity).sub(line.quantity),
            )
            .col_expr(inventory_item::Column::UpdatedAt, Expr::value(stamp))
            .filter(inventory_item::Column::Id.eq(item.id))
            .filter(inventory_item::Column::TenantId.eq(tenant))
            .filter(inventory_item::Column::Quantity.gte(line.quantity))
            .exec(txn)
            .await?;
        if decremented.rows_affected != 1 {
            return Err(insufficient(item.quantity));
        }

        let subtotal = item
            .unit_price
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| ServiceError::field("items", "Sale total is too large"))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| ServiceError::field("items", "Sale total is too large"))?;
        priced.push((item, line.quantity, subtotal));
    }

    let sale = scoped::insert(
        txn,
        tenant,
        sale::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.into_uuid()),
            work_order_id: Set(input.work_order_id),
            customer_id: Set(input.customer_id),
            kind: Set(SaleKind::for_work_order(input.work_order_id).as_str().to_string()),
            payment_method: Set(input
                .payment_method
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())),
            total: Set(total),
            created_at: Set(stamp),
        },
    )
    .await?;

    let mut items = Vec::with_capacity(priced.len());
    for (item, quantity, subtotal) in priced {
        let sale_item = scoped::insert(
            txn,
            tenant,
            sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant.into_uuid()),
                sale_id: Set(sale.id),
                inventory_item_id: Set(item.id),
                quantity: Set(quantity),
                unit_price: Set(item.unit_price),
                subtotal: Set(subtotal),
            },
        )
        .await?;
        items.push(sale_item);
    }

    Ok(SaleWithItems { sale, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lines_are_merged_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_lines(&[
            SaleLine { inventory_item_id: a, quantity: 2 },
            SaleLine { inventory_item_id: b, quantity: 1 },
            SaleLine { inventory_item_id: a, quantity: 3 },
        ])
        .unwrap();

        assert_eq!(
            merged,
            vec![
                SaleLine { inventory_item_id: a, quantity: 5 },
                SaleLine { inventory_item_id: b, quantity: 1 },
            ]
        );
    }

    #[test]
    fn merging_rejects_overflow() {
        let a = Uuid::new_v4();
        let result = merge_lines(&[
            SaleLine { inventory_item_id: a, quantity: i32::MAX },
            SaleLine { inventory_item_id: a, quantity: 1 },
        ]);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
