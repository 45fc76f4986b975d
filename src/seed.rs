//! Starter data for a fresh store: the stocked ingredients, the printed menu
//! with its recipes, and the counter staff.
//!
//! Seeding only runs against an empty menu, so it is safe to call on every
//! start-up.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::{
    db::DbPool,
    entities::{
        employee,
        inventory_item,
        menu_item::{self, MenuCategory},
        recipe_line,
    },
    errors::ServiceError,
};

/// (name, quantity on hand, unit cost)
const INVENTORY: &[(&str, i32, Decimal)] = &[
    ("Chicken Tenders", 500, dec!(0.45)),
    ("Fish Fillet", 200, dec!(1.10)),
    ("Fries Portion", 300, dec!(0.30)),
    ("Bun", 200, dec!(0.25)),
    ("Lettuce", 100, dec!(0.05)),
    ("Tortilla", 150, dec!(0.20)),
    ("Cup", 500, dec!(0.08)),
    ("Sauce Cup", 600, dec!(0.04)),
    ("Soda Syrup", 400, dec!(0.15)),
    ("Lemonade Mix", 200, dec!(0.18)),
    ("Coleslaw Portion", 120, dec!(0.35)),
];

struct SeedMenuItem {
    name: &'static str,
    price: Decimal,
    category: MenuCategory,
    is_vegetarian: bool,
    description: &'static str,
    recipe: &'static [(&'static str, i32)],
}

const MENU: &[SeedMenuItem] = &[
    SeedMenuItem {
        name: "2 Piece Chicken Meal",
        price: dec!(6.99),
        category: MenuCategory::Chicken,
        is_vegetarian: false,
        description: "Two hand-breaded tenders with fries and a sauce",
        recipe: &[("Chicken Tenders", 2), ("Fries Portion", 1), ("Sauce Cup", 1)],
    },
    SeedMenuItem {
        name: "3 Piece Chicken Meal",
        price: dec!(8.49),
        category: MenuCategory::Chicken,
        is_vegetarian: false,
        description: "Three hand-breaded tenders with fries and a sauce",
        recipe: &[("Chicken Tenders", 3), ("Fries Portion", 1), ("Sauce Cup", 1)],
    },
    SeedMenuItem {
        name: "5 Piece Chicken Meal",
        price: dec!(9.99),
        category: MenuCategory::Chicken,
        is_vegetarian: false,
        description: "Five hand-breaded tenders with fries and two sauces",
        recipe: &[("Chicken Tenders", 5), ("Fries Portion", 1), ("Sauce Cup", 2)],
    },
    SeedMenuItem {
        name: "Chicken Sandwich",
        price: dec!(7.49),
        category: MenuCategory::Chicken,
        is_vegetarian: false,
        description: "Crispy tenders on a toasted bun",
        recipe: &[("Chicken Tenders", 2), ("Bun", 1), ("Lettuce", 1)],
    },
    SeedMenuItem {
        name: "Fish Fillet Meal",
        price: dec!(8.99),
        category: MenuCategory::Fish,
        is_vegetarian: false,
        description: "Two fried fillets with fries and tartar sauce",
        recipe: &[("Fish Fillet", 2), ("Fries Portion", 1), ("Sauce Cup", 1)],
    },
    SeedMenuItem {
        name: "Fish Sandwich",
        price: dec!(7.99),
        category: MenuCategory::Fish,
        is_vegetarian: false,
        description: "Fried fillet on a toasted bun",
        recipe: &[("Fish Fillet", 1), ("Bun", 1), ("Lettuce", 1)],
    },
    SeedMenuItem {
        name: "Fish Tacos",
        price: dec!(8.49),
        category: MenuCategory::Fish,
        is_vegetarian: false,
        description: "Two tortillas with fried fish and slaw",
        recipe: &[("Fish Fillet", 1), ("Tortilla", 2), ("Lettuce", 1)],
    },
    SeedMenuItem {
        name: "Fries",
        price: dec!(2.99),
        category: MenuCategory::SidesExtras,
        is_vegetarian: true,
        description: "",
        recipe: &[("Fries Portion", 1)],
    },
    SeedMenuItem {
        name: "Coleslaw",
        price: dec!(2.49),
        category: MenuCategory::SidesExtras,
        is_vegetarian: true,
        description: "",
        recipe: &[("Coleslaw Portion", 1)],
    },
    SeedMenuItem {
        name: "Garden Salad",
        price: dec!(5.49),
        category: MenuCategory::Special,
        is_vegetarian: true,
        description: "Seasonal greens",
        recipe: &[("Lettuce", 2)],
    },
    SeedMenuItem {
        name: "Fountain Soda",
        price: dec!(1.99),
        category: MenuCategory::Drink,
        is_vegetarian: true,
        description: "",
        recipe: &[("Cup", 1), ("Soda Syrup", 1)],
    },
    SeedMenuItem {
        name: "Lemonade",
        price: dec!(2.29),
        category: MenuCategory::Drink,
        is_vegetarian: true,
        description: "",
        recipe: &[("Cup", 1), ("Lemonade Mix", 1)],
    },
];

/// (name, username, is_manager)
const STAFF: &[(&str, Option<&str>, bool)] = &[
    ("Kiosk", None, false),
    ("Jordan Lee", Some("jlee"), true),
    ("Sam Rivera", Some("srivera"), false),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub inventory_items: usize,
    pub menu_items: usize,
    pub recipe_lines: usize,
    pub employees: usize,
    /// False when the menu already had rows and nothing was written
    pub seeded: bool,
}

/// Loads the starter data in one transaction when the menu is empty.
#[instrument(skip(db))]
pub async fn seed_defaults(db: &DbPool) -> Result<SeedSummary, ServiceError> {
    let existing = menu_item::Entity::find().count(db).await?;
    if existing > 0 {
        info!(menu_items = existing, "menu already populated, skipping seed");
        return Ok(SeedSummary::default());
    }

    let txn = db.begin().await?;
    let summary = write_defaults(&txn).await?;
    txn.commit().await?;

    info!(
        inventory_items = summary.inventory_items,
        menu_items = summary.menu_items,
        employees = summary.employees,
        "seeded starter data"
    );
    Ok(summary)
}

async fn write_defaults<C>(conn: &C) -> Result<SeedSummary, ServiceError>
where
    C: ConnectionTrait,
{
    let mut summary = SeedSummary {
        seeded: true,
        ..Default::default()
    };

    let mut stock_ids: HashMap<&str, i32> = HashMap::new();
    for (name, quantity, unit_cost) in INVENTORY {
        let row = inventory_item::ActiveModel {
            name: Set((*name).to_string()),
            quantity: Set(*quantity),
            unit_cost: Set(*unit_cost),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        stock_ids.insert(name, row.id);
        summary.inventory_items += 1;
    }

    for item in MENU {
        let row = menu_item::ActiveModel {
            name: Set(item.name.to_string()),
            price: Set(item.price),
            category: Set(item.category),
            is_vegetarian: Set(item.is_vegetarian),
            description: Set(item.description.to_string()),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        summary.menu_items += 1;

        for (ingredient, quantity_needed) in item.recipe {
            let inventory_item_id = stock_ids.get(ingredient).copied().ok_or_else(|| {
                ServiceError::InternalError(format!("seed recipe names unknown stock {}", ingredient))
            })?;
            recipe_line::ActiveModel {
                menu_item_id: Set(row.id),
                inventory_item_id: Set(inventory_item_id),
                quantity_needed: Set(*quantity_needed),
            }
            .insert(conn)
            .await?;
            summary.recipe_lines += 1;
        }
    }

    for (name, username, is_manager) in STAFF {
        employee::ActiveModel {
            name: Set((*name).to_string()),
            username: Set(username.map(str::to_string)),
            is_manager: Set(*is_manager),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        summary.employees += 1;
    }

    Ok(summary)
}
