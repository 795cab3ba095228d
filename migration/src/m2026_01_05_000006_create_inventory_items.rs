//! Migration to create the inventory_items table.
//!
//! SKU is unique per tenant and the stock quantity can never go negative:
//! the CHECK constraint backs up the guarded decrement issued by sales.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryItems::TenantId).uuid().not_null())
                    .col(ColumnDef::new(InventoryItems::Sku).text().not_null())
                    .col(ColumnDef::new(InventoryItems::Name).text().not_null())
                    .col(
                        ColumnDef::new(InventoryItems::Category)
                            .text()
                            .not_null()
                            .default("otro"),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Quantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryItems::Quantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UnitPrice)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::MinStock)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_items_tenant_id")
                            .from(InventoryItems::Table, InventoryItems::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_items_tenant_sku")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::TenantId)
                    .col(InventoryItems::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_inventory_items_tenant_sku")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryItems {
    Table,
    Id,
    TenantId,
    Sku,
    Name,
    Category,
    Quantity,
    UnitPrice,
    MinStock,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
