//! Repository layer for tenant-owned records.
//!
//! Per-entity repositories sit on top of the tenant-scoped gateway in
//! [`scoped`]. Each takes the tenant as the first argument of every method
//! and works against any [`sea_orm::ConnectionTrait`].

pub mod appointment;
pub mod customer;
pub mod inventory;
pub mod motorcycle;
pub mod sale;
pub mod scoped;
pub mod technician;
pub mod tenant;
pub mod user;
pub mod work_order;

pub use appointment::AppointmentRepository;
pub use customer::CustomerRepository;
pub use inventory::InventoryRepository;
pub use motorcycle::MotorcycleRepository;
pub use sale::SaleRepository;
pub use technician::TechnicianRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
pub use work_order::WorkOrderRepository;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

const DEFAULT_PAGE_SIZE: u64 = 100;
const MAX_PAGE_SIZE: u64 = 500;

/// Offset pagination for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Trim and drop empty optional text
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(Page::new(Some(0), None).limit, 1);
        assert_eq!(Page::new(Some(10_000), Some(5)), Page { limit: 500, offset: 5 });
        assert_eq!(Page::default().limit, 100);
    }

    #[test]
    fn optional_text_is_trimmed() {
        assert_eq!(clean_optional(Some("  ".into())), None);
        assert_eq!(clean_optional(Some(" calle 5 ".into())).as_deref(), Some("calle 5"));
        assert_eq!(clean_optional(None), None);
    }
}
