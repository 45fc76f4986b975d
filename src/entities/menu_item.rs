use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub price: Decimal,
    pub category: MenuCategory,
    pub is_vegetarian: bool,
    pub description: String,
}

/// Menu sections shown at the till and on the kiosk
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum MenuCategory {
    #[sea_orm(string_value = "Chicken")]
    Chicken,
    #[sea_orm(string_value = "Fish")]
    Fish,
    #[sea_orm(string_value = "Sides/Extras")]
    #[serde(rename = "Sides/Extras")]
    #[strum(serialize = "Sides/Extras")]
    SidesExtras,
    #[sea_orm(string_value = "Special")]
    Special,
    #[sea_orm(string_value = "Drink")]
    Drink,
}

impl MenuCategory {
    /// Chicken and fish plates are sold as combos with a side and a drink.
    pub fn is_combo(self) -> bool {
        matches!(self, MenuCategory::Chicken | MenuCategory::Fish)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recipe_line::Entity")]
    RecipeLine,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::recipe_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeLine.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
