//! Migration to create the motorcycles table.
//!
//! A motorcycle belongs to one customer; deleting the customer removes it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Motorcycles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Motorcycles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Motorcycles::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Motorcycles::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Motorcycles::Plate).text().not_null())
                    .col(ColumnDef::new(Motorcycles::Brand).text().not_null())
                    .col(ColumnDef::new(Motorcycles::Model).text().not_null())
                    .col(ColumnDef::new(Motorcycles::Year).integer().null())
                    .col(ColumnDef::new(Motorcycles::Color).text().null())
                    .col(ColumnDef::new(Motorcycles::Mileage).integer().null())
                    .col(
                        ColumnDef::new(Motorcycles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Motorcycles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_motorcycles_tenant_id")
                            .from(Motorcycles::Table, Motorcycles::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_motorcycles_customer_id")
                            .from(Motorcycles::Table, Motorcycles::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_motorcycles_tenant_plate")
                    .table(Motorcycles::Table)
                    .col(Motorcycles::TenantId)
                    .col(Motorcycles::Plate)
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
                    .name("idx_motorcycles_tenant_plate")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Motorcycles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Motorcycles {
    Table,
    Id,
    TenantId,
    CustomerId,
    Plate,
    Brand,
    Model,
    Year,
    Color,
    Mileage,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
