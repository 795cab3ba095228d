//! Appointment entity model

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Scheduled visit of a customer to the shop
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub customer_id: Uuid,

    /// Motorcycle to be serviced, when known in advance
    pub motorcycle_id: Option<Uuid>,

    pub scheduled_at: DateTimeWithTimeZone,

    pub reason: String,

    /// Stored form of [`AppointmentStatus`]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Programada,
    Completada,
    Cancelada,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Programada => "programada",
            AppointmentStatus::Completada => "completada",
            AppointmentStatus::Cancelada => "cancelada",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "programada" => Ok(AppointmentStatus::Programada),
            "completada" => Ok(AppointmentStatus::Completada),
            "cancelada" => Ok(AppointmentStatus::Cancelada),
            _ => Err(format!("unknown appointment status '{value}'")),
        }
    }
}
