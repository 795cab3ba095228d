//! Customer entity model
//!
//! Customers are unique per tenant on both email and national id (cedula).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Customer of a repair shop
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Tenant identifier for multi-tenancy
    pub tenant_id: Uuid,

    /// Full name
    pub name: String,

    /// Email address (unique per tenant)
    pub email: String,

    /// National identification number (unique per tenant)
    pub cedula: String,

    /// Phone number used for WhatsApp notifications (optional)
    pub phone: Option<String>,

    /// Postal address (optional)
    pub address: Option<String>,

    /// Timestamp when the customer was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the customer was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::motorcycle::Entity")]
    Motorcycle,
}

impl Related<super::motorcycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motorcycle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
