//! Sale entity model
//!
//! A sale is either a service sale (tied to a work order) or a counter
//! sale. Its total is computed once, from price snapshots, at creation.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Work order billed by this sale (service sales only)
    pub work_order_id: Option<Uuid>,

    pub customer_id: Option<Uuid>,

    /// Stored form of [`SaleKind`]
    pub kind: String,

    pub payment_method: String,

    /// Sum of item subtotals in minor currency units
    pub total: i64,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItem,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SaleKind {
    Service,
    Counter,
}

impl SaleKind {
    pub fn for_work_order(work_order_id: Option<Uuid>) -> Self {
        if work_order_id.is_some() {
            SaleKind::Service
        } else {
            SaleKind::Counter
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleKind::Service => "service",
            SaleKind::Counter => "counter",
        }
    }
}
