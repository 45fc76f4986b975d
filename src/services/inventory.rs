use crate::{
    config::StockPolicy,
    db::{DbPool, WriteGate},
    entities::inventory_item::{self, Entity as InventoryItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryItemRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub unit_cost: Option<Decimal>,
}

/// A manual stock correction. Negative deltas consume, positive deltas receive.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustInventoryRequest {
    pub delta: i32,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryItemView {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

impl From<inventory_item::Model> for InventoryItemView {
    fn from(model: inventory_item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            quantity: model.quantity,
            unit_cost: model.unit_cost.round_dp(2),
        }
    }
}

/// Stock movement on one inventory item caused by a single unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryChange {
    pub inventory_item_id: i32,
    pub name: String,
    pub consumed: i32,
    pub remaining: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryAdjustment {
    pub inventory_item_id: i32,
    pub name: String,
    pub old_quantity: i32,
    pub new_quantity: i32,
    pub warnings: Vec<String>,
}

/// Result of consuming ingredients inside a transaction
#[derive(Debug, Default)]
pub(crate) struct Consumption {
    pub changes: Vec<InventoryChange>,
    pub warnings: Vec<String>,
}

impl Consumption {
    /// Events to publish once the surrounding transaction has committed.
    pub(crate) fn negative_stock_events(&self) -> Vec<Event> {
        self.changes
            .iter()
            .filter(|c| c.remaining < 0)
            .map(|c| Event::StockWentNegative {
                inventory_item_id: c.inventory_item_id,
                name: c.name.clone(),
                quantity: c.remaining,
            })
            .collect()
    }
}

fn shortage_warning(name: &str, remaining: i32) -> String {
    format!("{} stock is negative ({})", name, remaining)
}

/// Decrements every inventory item in `needs` (item id to units) on `conn`.
///
/// Rows are locked in ascending id order before any is written. Under
/// [`StockPolicy::Reject`] nothing is written when any item would go below
/// zero; the error lists every short item. Under
/// [`StockPolicy::AllowNegative`] the write proceeds and each item that ends
/// below zero produces a warning.
pub(crate) async fn consume<C>(
    conn: &C,
    needs: &BTreeMap<i32, i32>,
    policy: StockPolicy,
) -> Result<Consumption, ServiceError>
where
    C: ConnectionTrait,
{
    let needs: BTreeMap<i32, i32> = needs
        .iter()
        .filter(|(_, units)| **units > 0)
        .map(|(id, units)| (*id, *units))
        .collect();
    if needs.is_empty() {
        return Ok(Consumption::default());
    }

    let ids: Vec<i32> = needs.keys().copied().collect();
    let rows = InventoryItemEntity::find()
        .filter(inventory_item::Column::Id.is_in(ids.clone()))
        .order_by_asc(inventory_item::Column::Id)
        .lock_exclusive()
        .all(conn)
        .await?;

    if rows.len() != ids.len() {
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !rows.iter().any(|r| r.id == **id))
            .map(|id| id.to_string())
            .collect();
        return Err(ServiceError::NotFound(format!(
            "Inventory item(s) {} not found",
            missing.join(", ")
        )));
    }

    if policy == StockPolicy::Reject {
        let shortages: Vec<String> = rows
            .iter()
            .filter_map(|row| {
                let wanted = needs.get(&row.id).copied().unwrap_or_default();
                (row.quantity < wanted)
                    .then(|| format!("{} needs {}, has {}", row.name, wanted, row.quantity))
            })
            .collect();
        if !shortages.is_empty() {
            counter!("feathers.inventory.rejections", 1);
            return Err(ServiceError::InsufficientStock(shortages.join("; ")));
        }
    }

    let mut outcome = Consumption::default();
    for row in rows {
        let units = needs.get(&row.id).copied().unwrap_or_default();
        InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::Quantity,
                Expr::col(inventory_item::Column::Quantity).sub(units),
            )
            .filter(inventory_item::Column::Id.eq(row.id))
            .exec(conn)
            .await?;

        let remaining = row.quantity - units;
        if remaining < 0 {
            warn!(inventory_item_id = row.id, remaining, "stock below zero");
            outcome.warnings.push(shortage_warning(&row.name, remaining));
        }
        outcome.changes.push(InventoryChange {
            inventory_item_id: row.id,
            name: row.name,
            consumed: units,
            remaining,
        });
    }

    Ok(outcome)
}

/// Service for raw ingredient stock
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
    event_sender: EventSender,
    stock_policy: StockPolicy,
}

impl InventoryService {
    pub fn new(
        db_pool: Arc<DbPool>,
        write_gate: WriteGate,
        event_sender: EventSender,
        stock_policy: StockPolicy,
    ) -> Self {
        Self {
            db_pool,
            write_gate,
            event_sender,
            stock_policy,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<InventoryItemView>, ServiceError> {
        let items = InventoryItemEntity::find()
            .order_by_asc(inventory_item::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(items.into_iter().map(InventoryItemView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: i32) -> Result<InventoryItemView, ServiceError> {
        self.find_model(id).await.map(InventoryItemView::from)
    }

    /// True when an item with exactly this name is stocked.
    #[instrument(skip(self))]
    pub async fn exists(&self, name: &str) -> Result<bool, ServiceError> {
        let found = InventoryItemEntity::find()
            .filter(inventory_item::Column::Name.eq(name.trim()))
            .one(&*self.db_pool)
            .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateInventoryItemRequest,
    ) -> Result<InventoryItemView, ServiceError> {
        request.validate()?;
        if request.unit_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_cost: must not be negative".to_string(),
            ));
        }

        let name = request.name.trim().to_string();
        let created = inventory_item::ActiveModel {
            name: Set(name.clone()),
            quantity: Set(request.quantity),
            unit_cost: Set(request.unit_cost.round_dp(2)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Inventory item {} already exists", name))
        })?;

        info!(inventory_item_id = created.id, "inventory item created");
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        id: i32,
        request: UpdateInventoryItemRequest,
    ) -> Result<InventoryItemView, ServiceError> {
        request.validate()?;
        if matches!(request.unit_cost, Some(cost) if cost < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "unit_cost: must not be negative".to_string(),
            ));
        }

        let existing = self.find_model(id).await?;
        let old_quantity = existing.quantity;
        let mut active: inventory_item::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(cost) = request.unit_cost {
            active.unit_cost = Set(cost.round_dp(2));
        }

        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_write(e, "Inventory item name already taken"))?;

        if updated.quantity != old_quantity {
            self.event_sender
                .send_or_log(Event::InventoryAdjusted {
                    inventory_item_id: id,
                    old_quantity,
                    new_quantity: updated.quantity,
                    reason: "recount".to_string(),
                })
                .await;
        }

        info!(inventory_item_id = id, "inventory item updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i32) -> Result<(), ServiceError> {
        let existing = self.find_model(id).await?;
        InventoryItemEntity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                ServiceError::from_write(e, format!("Inventory item {} is still referenced", id))
            })?;

        info!(inventory_item_id = id, "inventory item deleted");
        Ok(())
    }

    /// Applies a signed stock correction under the configured stock policy.
    #[instrument(skip(self, request), fields(delta = request.delta))]
    pub async fn adjust(
        &self,
        id: i32,
        request: AdjustInventoryRequest,
    ) -> Result<InventoryAdjustment, ServiceError> {
        request.validate()?;
        if request.delta == 0 {
            return Err(ServiceError::ValidationError(
                "delta: must not be zero".to_string(),
            ));
        }

        let _write = self.write_gate.enter().await;
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let row = InventoryItemEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))?;

        let new_quantity = row.quantity.checked_add(request.delta).ok_or_else(|| {
            ServiceError::ValidationError("delta: quantity would overflow".to_string())
        })?;

        let mut warnings = Vec::new();
        if new_quantity < 0 {
            if self.stock_policy == StockPolicy::Reject {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} needs {}, has {}",
                    row.name, -request.delta, row.quantity
                )));
            }
            warnings.push(shortage_warning(&row.name, new_quantity));
        }

        InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::Quantity,
                Expr::col(inventory_item::Column::Quantity).add(request.delta),
            )
            .filter(inventory_item::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, inventory_item_id = id, "Failed to commit inventory adjustment");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send_or_log(Event::InventoryAdjusted {
                inventory_item_id: id,
                old_quantity: row.quantity,
                new_quantity,
                reason: request
                    .reason
                    .clone()
                    .unwrap_or_else(|| "manual adjustment".to_string()),
            })
            .await;
        if new_quantity < 0 {
            self.event_sender
                .send_or_log(Event::StockWentNegative {
                    inventory_item_id: id,
                    name: row.name.clone(),
                    quantity: new_quantity,
                })
                .await;
        }

        info!(
            inventory_item_id = id,
            old_quantity = row.quantity,
            new_quantity,
            "inventory adjusted"
        );
        Ok(InventoryAdjustment {
            inventory_item_id: id,
            name: row.name,
            old_quantity: row.quantity,
            new_quantity,
            warnings,
        })
    }

    async fn find_model(&self, id: i32) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))
    }
}
