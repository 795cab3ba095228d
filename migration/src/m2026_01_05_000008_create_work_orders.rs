//! Migration to create the work_orders table.
//!
//! Each lifecycle status has its own timestamp column; `completed_at` is
//! stamped when the order reaches the terminal status.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkOrders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkOrders::TenantId).uuid().not_null())
                    .col(ColumnDef::new(WorkOrders::MotorcycleId).uuid().not_null())
                    .col(ColumnDef::new(WorkOrders::TechnicianId).uuid().not_null())
                    .col(ColumnDef::new(WorkOrders::Description).text().not_null())
                    .col(ColumnDef::new(WorkOrders::Diagnosis).text().null())
                    .col(
                        ColumnDef::new(WorkOrders::LaborCost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::Status)
                            .text()
                            .not_null()
                            .default("Diagnosticando"),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::DiagnosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::RepairedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WorkOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_orders_tenant_id")
                            .from(WorkOrders::Table, WorkOrders::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_orders_motorcycle_id")
                            .from(WorkOrders::Table, WorkOrders::MotorcycleId)
                            .to(Motorcycles::Table, Motorcycles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_orders_technician_id")
                            .from(WorkOrders::Table, WorkOrders::TechnicianId)
                            .to(Technicians::Table, Technicians::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_work_orders_tenant_status")
                    .table(WorkOrders::Table)
                    .col(WorkOrders::TenantId)
                    .col(WorkOrders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_work_orders_tenant_status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WorkOrders {
    Table,
    Id,
    TenantId,
    MotorcycleId,
    TechnicianId,
    Description,
    Diagnosis,
    LaborCost,
    Status,
    DiagnosedAt,
    RepairedAt,
    DeliveredAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Motorcycles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Technicians {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
