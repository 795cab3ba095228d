//! # Data Models
//!
//! SeaORM entities for every table plus the small enums stored as text
//! columns (statuses, categories, roles).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod appointment;
pub mod customer;
pub mod inventory_item;
pub mod motorcycle;
pub mod sale;
pub mod sale_item;
pub mod technician;
pub mod tenant;
pub mod user;
pub mod work_order;

pub use appointment::Entity as Appointment;
pub use customer::Entity as Customer;
pub use inventory_item::Entity as InventoryItem;
pub use motorcycle::Entity as Motorcycle;
pub use sale::Entity as Sale;
pub use sale_item::Entity as SaleItem;
pub use technician::Entity as Technician;
pub use tenant::Entity as Tenant;
pub use user::Entity as User;
pub use work_order::Entity as WorkOrder;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "taller".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
