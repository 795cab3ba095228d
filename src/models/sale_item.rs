//! Sale item entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// One inventory item consumed by a sale, with a frozen unit price
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub sale_id: Uuid,

    pub inventory_item_id: Uuid,

    pub quantity: i32,

    /// Price copied from the inventory item when the sale was recorded
    pub unit_price: i64,

    /// `quantity * unit_price`
    pub subtotal: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
