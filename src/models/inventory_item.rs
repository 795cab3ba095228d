//! Inventory item entity model
//!
//! SKUs are unique per tenant. `quantity` never drops below zero; sales
//! decrement it through a guarded update inside their transaction.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Stock keeping unit (unique per tenant)
    pub sku: String,

    pub name: String,

    /// Stored form of [`InventoryCategory`]
    pub category: String,

    /// Units on hand
    pub quantity: i32,

    /// Current selling price in minor currency units
    pub unit_price: i64,

    /// Threshold at or below which the item is reported as low stock
    pub min_stock: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Enumerated inventory categories accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryCategory {
    Repuesto,
    Accesorio,
    Lubricante,
    Llanta,
    Herramienta,
    Otro,
}

impl InventoryCategory {
    pub const ALL: [InventoryCategory; 6] = [
        InventoryCategory::Repuesto,
        InventoryCategory::Accesorio,
        InventoryCategory::Lubricante,
        InventoryCategory::Llanta,
        InventoryCategory::Herramienta,
        InventoryCategory::Otro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryCategory::Repuesto => "repuesto",
            InventoryCategory::Accesorio => "accesorio",
            InventoryCategory::Lubricante => "lubricante",
            InventoryCategory::Llanta => "llanta",
            InventoryCategory::Herramienta => "herramienta",
            InventoryCategory::Otro => "otro",
        }
    }
}

impl fmt::Display for InventoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        InventoryCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| format!("unknown inventory category '{value}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_categories_case_insensitively() {
        assert_eq!(
            "Lubricante".parse::<InventoryCategory>().unwrap(),
            InventoryCategory::Lubricante
        );
        assert_eq!(
            " llanta ".parse::<InventoryCategory>().unwrap(),
            InventoryCategory::Llanta
        );
        assert!("motor".parse::<InventoryCategory>().is_err());
    }
}
