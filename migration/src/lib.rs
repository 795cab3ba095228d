//! Database migrations for the Taller API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_000001_create_tenants;
mod m2026_01_05_000002_create_users;
mod m2026_01_05_000003_create_customers;
mod m2026_01_05_000004_create_motorcycles;
mod m2026_01_05_000005_create_technicians;
mod m2026_01_05_000006_create_inventory_items;
mod m2026_01_05_000007_create_appointments;
mod m2026_01_05_000008_create_work_orders;
mod m2026_01_05_000009_create_sales;
mod m2026_01_05_000010_create_sale_items;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_000001_create_tenants::Migration),
            Box::new(m2026_01_05_000002_create_users::Migration),
            Box::new(m2026_01_05_000003_create_customers::Migration),
            Box::new(m2026_01_05_000004_create_motorcycles::Migration),
            Box::new(m2026_01_05_000005_create_technicians::Migration),
            Box::new(m2026_01_05_000006_create_inventory_items::Migration),
            Box::new(m2026_01_05_000007_create_appointments::Migration),
            Box::new(m2026_01_05_000008_create_work_orders::Migration),
            Box::new(m2026_01_05_000009_create_sales::Migration),
            Box::new(m2026_01_05_000010_create_sale_items::Migration),
        ]
    }
}
