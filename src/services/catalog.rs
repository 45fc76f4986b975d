use crate::{
    db::{DbPool, WriteGate},
    entities::{
        inventory_item::{self, Entity as InventoryItemEntity},
        menu_item::{self, Entity as MenuItemEntity, MenuCategory},
        recipe_line::{self, Entity as RecipeLineEntity},
    },
    errors::ServiceError,
    services::money,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// One ingredient of a new menu item, referenced by inventory name
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecipeIngredient {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub inventory_name: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    pub price: Decimal,
    pub category: MenuCategory,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub description: String,
    #[serde(default)]
    #[validate]
    pub recipe: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<MenuCategory>,
    pub is_vegetarian: Option<bool>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MenuItemView {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub category: MenuCategory,
    pub is_vegetarian: bool,
    pub description: String,
    /// Sold with a side and a drink rung up as their own lines
    pub is_combo: bool,
}

impl From<menu_item::Model> for MenuItemView {
    fn from(model: menu_item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: money(model.price),
            category: model.category,
            is_vegetarian: model.is_vegetarian,
            description: model.description,
            is_combo: model.category.is_combo(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecipeLineView {
    pub inventory_item_id: i32,
    pub inventory_name: String,
    pub quantity_needed: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MenuItemWithRecipe {
    #[serde(flatten)]
    pub item: MenuItemView,
    pub recipe: Vec<RecipeLineView>,
}

fn check_price(price: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "price: must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > 2 {
        return Err(ServiceError::ValidationError(
            "price: at most 2 decimal places".to_string(),
        ));
    }
    Ok(())
}

/// Units of each inventory item (by id) consumed by one unit of each menu item.
pub(crate) async fn recipes_for<C>(
    conn: &C,
    menu_item_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<recipe_line::Model>>, ServiceError>
where
    C: ConnectionTrait,
{
    let lines = RecipeLineEntity::find()
        .filter(recipe_line::Column::MenuItemId.is_in(menu_item_ids))
        .order_by_asc(recipe_line::Column::InventoryItemId)
        .all(conn)
        .await?;

    let mut by_item: HashMap<i32, Vec<recipe_line::Model>> = HashMap::new();
    for line in lines {
        by_item.entry(line.menu_item_id).or_default().push(line);
    }
    Ok(by_item)
}

/// Service for menu items and their recipes
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, write_gate: WriteGate) -> Self {
        Self {
            db_pool,
            write_gate,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_menu_items(
        &self,
        category: Option<MenuCategory>,
    ) -> Result<Vec<MenuItemView>, ServiceError> {
        let mut query = MenuItemEntity::find().order_by_asc(menu_item::Column::Id);
        if let Some(category) = category {
            query = query.filter(menu_item::Column::Category.eq(category));
        }
        let items = query.all(&*self.db_pool).await?;
        Ok(items.into_iter().map(MenuItemView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_menu_item(&self, id: i32) -> Result<MenuItemView, ServiceError> {
        self.find_model(id).await.map(MenuItemView::from)
    }

    /// The ingredients consumed by one unit of a menu item
    #[instrument(skip(self))]
    pub async fn recipe(&self, menu_item_id: i32) -> Result<Vec<RecipeLineView>, ServiceError> {
        self.find_model(menu_item_id).await?;
        self.recipe_views(&*self.db_pool, menu_item_id).await
    }

    /// Adds a menu item together with its recipe.
    ///
    /// Every ingredient must name an existing inventory item; repeated names
    /// are merged. Nothing is written when any name is unknown.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_menu_item(
        &self,
        request: CreateMenuItemRequest,
    ) -> Result<MenuItemWithRecipe, ServiceError> {
        request.validate()?;
        check_price(request.price)?;

        let mut wanted: BTreeMap<String, i32> = BTreeMap::new();
        for ingredient in &request.recipe {
            *wanted
                .entry(ingredient.inventory_name.trim().to_string())
                .or_default() += ingredient.quantity;
        }

        let _write = self.write_gate.enter().await;
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let stocked = InventoryItemEntity::find()
            .filter(inventory_item::Column::Name.is_in(wanted.keys().cloned().collect::<Vec<_>>()))
            .all(&txn)
            .await?;
        let unknown: Vec<&str> = wanted
            .keys()
            .filter(|name| !stocked.iter().any(|s| &s.name == *name))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "recipe: unknown inventory item(s) {}",
                unknown.join(", ")
            )));
        }

        let name = request.name.trim().to_string();
        let created = menu_item::ActiveModel {
            name: Set(name.clone()),
            price: Set(money(request.price)),
            category: Set(request.category),
            is_vegetarian: Set(request.is_vegetarian),
            description: Set(request.description.trim().to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("Menu item {} already exists", name)))?;

        if !stocked.is_empty() {
            let lines = stocked.iter().map(|inv| recipe_line::ActiveModel {
                menu_item_id: Set(created.id),
                inventory_item_id: Set(inv.id),
                quantity_needed: Set(wanted.get(&inv.name).copied().unwrap_or(1)),
            });
            RecipeLineEntity::insert_many(lines)
                .exec_without_returning(&txn)
                .await?;
        }

        let recipe = self.recipe_views(&txn, created.id).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit menu item creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(menu_item_id = created.id, ingredients = recipe.len(), "menu item created");
        Ok(MenuItemWithRecipe {
            item: created.into(),
            recipe,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_menu_item(
        &self,
        id: i32,
        request: UpdateMenuItemRequest,
    ) -> Result<MenuItemView, ServiceError> {
        request.validate()?;
        if let Some(price) = request.price {
            check_price(price)?;
        }

        let mut active: menu_item::ActiveModel = self.find_model(id).await?.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(price) = request.price {
            active.price = Set(money(price));
        }
        if let Some(category) = request.category {
            active.category = Set(category);
        }
        if let Some(is_vegetarian) = request.is_vegetarian {
            active.is_vegetarian = Set(is_vegetarian);
        }
        if let Some(description) = request.description {
            active.description = Set(description.trim().to_string());
        }

        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_write(e, "Menu item name already taken"))?;

        info!(menu_item_id = id, "menu item updated");
        Ok(updated.into())
    }

    /// Removes a menu item and its recipe. Items that appear on orders stay.
    #[instrument(skip(self))]
    pub async fn delete_menu_item(&self, id: i32) -> Result<(), ServiceError> {
        let existing = self.find_model(id).await?;
        MenuItemEntity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                ServiceError::from_write(e, format!("Menu item {} has been sold and cannot be deleted", id))
            })?;

        info!(menu_item_id = id, "menu item deleted");
        Ok(())
    }

    async fn recipe_views<C>(
        &self,
        conn: &C,
        menu_item_id: i32,
    ) -> Result<Vec<RecipeLineView>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let lines = RecipeLineEntity::find()
            .filter(recipe_line::Column::MenuItemId.eq(menu_item_id))
            .find_also_related(InventoryItemEntity)
            .order_by_asc(recipe_line::Column::InventoryItemId)
            .all(conn)
            .await?;

        Ok(lines
            .into_iter()
            .map(|(line, inventory)| RecipeLineView {
                inventory_item_id: line.inventory_item_id,
                inventory_name: inventory.map(|i| i.name).unwrap_or_default(),
                quantity_needed: line.quantity_needed,
            })
            .collect())
    }

    async fn find_model(&self, id: i32) -> Result<menu_item::Model, ServiceError> {
        MenuItemEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))
    }
}
