//! Work order entity model
//!
//! A work order tracks one repair job: a motorcycle, the technician
//! assigned to it and the status lifecycle
//! `Diagnosticando` → `Reparado` → `Entregado`. Each status owns a
//! timestamp column; `completed_at` is stamped on the terminal status.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub motorcycle_id: Uuid,

    pub technician_id: Uuid,

    /// Problem reported by the customer
    pub description: String,

    /// Technician findings (optional)
    pub diagnosis: Option<String>,

    /// Labor charge in minor currency units
    pub labor_cost: i64,

    /// Stored form of [`WorkOrderStatus`]
    pub status: String,

    pub diagnosed_at: Option<DateTimeWithTimeZone>,

    pub repaired_at: Option<DateTimeWithTimeZone>,

    pub delivered_at: Option<DateTimeWithTimeZone>,

    pub completed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::motorcycle::Entity",
        from = "Column::MotorcycleId",
        to = "super::motorcycle::Column::Id"
    )]
    Motorcycle,
    #[sea_orm(
        belongs_to = "super::technician::Entity",
        from = "Column::TechnicianId",
        to = "super::technician::Column::Id"
    )]
    Technician,
}

impl Related<super::motorcycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motorcycle.def()
    }
}

impl Related<super::technician::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Technician.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Work order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum WorkOrderStatus {
    Diagnosticando,
    Reparado,
    Entregado,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Diagnosticando => "Diagnosticando",
            WorkOrderStatus::Reparado => "Reparado",
            WorkOrderStatus::Entregado => "Entregado",
        }
    }

    /// Whether this is the terminal status of the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Entregado)
    }

    /// Whether moving from `self` to `next` follows the forward-only order.
    /// Staying on the same status is always allowed.
    pub fn can_advance_to(&self, next: WorkOrderStatus) -> bool {
        next >= *self
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Diagnosticando" => Ok(WorkOrderStatus::Diagnosticando),
            "Reparado" => Ok(WorkOrderStatus::Reparado),
            "Entregado" => Ok(WorkOrderStatus::Entregado),
            other => Err(format!("unknown work order status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_order_is_monotonic() {
        use WorkOrderStatus::*;

        assert!(Diagnosticando.can_advance_to(Reparado));
        assert!(Reparado.can_advance_to(Entregado));
        assert!(Diagnosticando.can_advance_to(Entregado));
        assert!(Reparado.can_advance_to(Reparado));
        assert!(!Entregado.can_advance_to(Diagnosticando));
        assert!(!Reparado.can_advance_to(Diagnosticando));
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            WorkOrderStatus::Diagnosticando,
            WorkOrderStatus::Reparado,
            WorkOrderStatus::Entregado,
        ] {
            assert_eq!(status.as_str().parse::<WorkOrderStatus>().unwrap(), status);
        }
        assert!("reparado".parse::<WorkOrderStatus>().is_err());
    }
}
