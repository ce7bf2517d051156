use sea_orm::entity::prelude::*;

use crate::domain::{Brand, CatalogEntry, Country, DiscountCode};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub brand: Brand,
    pub country: Country,
    pub height: i32,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub price: Decimal,
    pub description: String,
    pub stock: i32,
    pub discount: DiscountCode,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CatalogEntry {
    fn from(model: Model) -> Self {
        CatalogEntry {
            id: model.id,
            name: model.name,
            brand: model.brand,
            country: model.country,
            height: model.height,
            price: model.price,
            description: model.description,
            stock: model.stock,
            discount: model.discount,
        }
    }
}
