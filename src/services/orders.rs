use crate::{
    config::StockPolicy,
    db::{DbPool, WriteGate},
    entities::{
        customer::{self, Entity as CustomerEntity},
        employee::Entity as EmployeeEntity,
        menu_item::{self, Entity as MenuItemEntity},
        order::{self, Entity as OrderEntity, OrderType},
        order_item::{self, Entity as OrderItemEntity},
        recipe_line,
    },
    errors::ServiceError,
    events::{Event, EventSender, KitchenFeed},
    middleware_helpers::IdempotencyKey,
    services::{
        catalog::recipes_for,
        customers::{resolve_by_phone, NewCustomer},
        inventory::{consume, InventoryChange},
        money,
    },
    tracing::with_metrics,
};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

const MAX_LINE_QUANTITY: i32 = 99;
const MAX_MODIFICATIONS_LEN: usize = 255;
/// Placement re-runs from the top when a concurrent writer holds the lock;
/// a retry that finds its key already committed replays it.
const PLACE_ATTEMPTS: u32 = 5;

/// Who the order is for: a known customer id, or name and phone for a
/// first-time or returning customer matched by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CustomerRef {
    Existing { customer_id: i32 },
    New(NewCustomer),
}

/// One cart line. `unit_price` defaults to the current menu price; combo
/// sides and drinks are rung up at 0.00.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub menu_item_id: i32,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub modifications: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub customer: CustomerRef,
    /// Falls back to the signed-in employee when omitted
    pub employee_id: Option<i32>,
    pub order_type: OrderType,
    pub lines: Vec<OrderLineRequest>,
    /// Client-computed total; rejected when it disagrees with the lines
    pub total: Option<Decimal>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineView {
    pub id: i32,
    pub menu_item_id: i32,
    pub menu_item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub modifications: String,
}

impl OrderLineView {
    fn new(line: order_item::Model, menu_item_name: String) -> Self {
        let unit_price = money(line.unit_price);
        Self {
            id: line.id,
            menu_item_id: line.menu_item_id,
            menu_item_name,
            quantity: line.quantity,
            unit_price,
            line_total: money(unit_price * Decimal::from(line.quantity)),
            modifications: line.modifications,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
    pub id: i32,
    pub customer_id: i32,
    pub customer_name: String,
    pub employee_id: i32,
    pub order_date: NaiveDate,
    pub order_time: NaiveTime,
    pub order_type: OrderType,
    pub total_amount: Decimal,
    pub is_done: bool,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    fn assemble(order: order::Model, customer_name: String, lines: Vec<OrderLineView>) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            customer_name,
            employee_id: order.employee_id,
            order_date: order.order_date,
            order_time: order.order_time,
            order_type: order.order_type,
            total_amount: money(order.total_amount),
            is_done: order.is_done,
            lines,
        }
    }
}

/// Flattened line as printed on a kitchen ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KitchenLineView {
    pub order_id: i32,
    pub customer_name: String,
    pub order_date: NaiveDate,
    pub order_time: NaiveTime,
    pub order_type: OrderType,
    pub menu_item_id: i32,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub modifications: String,
}

/// What a committed order mutation produced.
///
/// A replayed placement carries the original order with no inventory
/// changes, since nothing was consumed the second time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderReceipt {
    pub order: OrderView,
    pub inventory_changes: Vec<InventoryChange>,
    pub warnings: Vec<String>,
    pub replayed: bool,
}

#[derive(Debug, Clone)]
struct PricedLine {
    menu_item_id: i32,
    quantity: i32,
    unit_price: Decimal,
    modifications: String,
}

enum Attempt {
    Done(Box<OrderReceipt>),
    /// Another request committed the same idempotency key first
    LostRace,
}

fn invalid(path: &str, field: &str, message: &str) -> ServiceError {
    if path.is_empty() {
        ServiceError::ValidationError(format!("{}: {}", field, message))
    } else {
        ServiceError::ValidationError(format!("{}.{}: {}", path, field, message))
    }
}

fn validate_line(path: &str, line: &OrderLineRequest) -> Result<(), ServiceError> {
    if line.quantity < 1 {
        return Err(invalid(path, "quantity", "must be at least 1"));
    }
    if line.quantity > MAX_LINE_QUANTITY {
        return Err(invalid(
            path,
            "quantity",
            &format!("must be at most {}", MAX_LINE_QUANTITY),
        ));
    }
    if let Some(price) = line.unit_price {
        if price < Decimal::ZERO {
            return Err(invalid(path, "unit_price", "must not be negative"));
        }
        if price.normalize().scale() > 2 {
            return Err(invalid(path, "unit_price", "at most 2 decimal places"));
        }
    }
    if let Some(mods) = &line.modifications {
        if mods.chars().count() > MAX_MODIFICATIONS_LEN {
            return Err(invalid(
                path,
                "modifications",
                &format!("must be at most {} characters", MAX_MODIFICATIONS_LEN),
            ));
        }
    }
    Ok(())
}

fn validate_cart(request: &PlaceOrderRequest) -> Result<(), ServiceError> {
    if request.lines.is_empty() {
        return Err(invalid("", "lines", "cart must contain at least one line"));
    }
    for (index, line) in request.lines.iter().enumerate() {
        validate_line(&format!("lines[{}]", index), line)?;
    }
    Ok(())
}

fn cart_total(lines: &[PricedLine]) -> Decimal {
    money(
        lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum(),
    )
}

/// Sums recipe requirements over `(menu_item_id, quantity)` pairs into units
/// per inventory item.
fn aggregate_needs(
    lines: &[(i32, i32)],
    recipes: &HashMap<i32, Vec<recipe_line::Model>>,
) -> Result<BTreeMap<i32, i32>, ServiceError> {
    let mut needs: BTreeMap<i32, i32> = BTreeMap::new();
    for (menu_item_id, quantity) in lines {
        for ingredient in recipes.get(menu_item_id).into_iter().flatten() {
            let units = ingredient
                .quantity_needed
                .checked_mul(*quantity)
                .and_then(|u| u.checked_add(needs.get(&ingredient.inventory_item_id).copied().unwrap_or(0)))
                .ok_or_else(|| {
                    ServiceError::ValidationError("lines: ingredient quantity overflow".to_string())
                })?;
            needs.insert(ingredient.inventory_item_id, units);
        }
    }
    Ok(needs)
}

/// sha256 over the parts of a placement that decide its outcome. The
/// idempotency key itself is left out.
fn request_fingerprint(request: &PlaceOrderRequest, employee_id: i32) -> Result<String, ServiceError> {
    #[derive(Serialize)]
    struct CanonicalLine<'a> {
        menu_item_id: i32,
        quantity: i32,
        unit_price: Option<String>,
        modifications: &'a str,
    }

    #[derive(Serialize)]
    struct Canonical<'a> {
        customer: &'a CustomerRef,
        employee_id: i32,
        order_type: OrderType,
        lines: Vec<CanonicalLine<'a>>,
        total: Option<String>,
    }

    let canonical = Canonical {
        customer: &request.customer,
        employee_id,
        order_type: request.order_type,
        lines: request
            .lines
            .iter()
            .map(|l| CanonicalLine {
                menu_item_id: l.menu_item_id,
                quantity: l.quantity,
                unit_price: l.unit_price.map(|p| p.normalize().to_string()),
                modifications: l.modifications.as_deref().unwrap_or("").trim(),
            })
            .collect(),
        total: request.total.map(|t| t.normalize().to_string()),
    };

    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| ServiceError::InternalError(format!("fingerprint encoding: {}", e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Joins orders with their lines, item names and customer names.
pub(crate) async fn load_views<C>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderView>, ServiceError>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let customer_ids: Vec<i32> = orders
        .iter()
        .map(|o| o.customer_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let lines = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Id)
        .find_also_related(MenuItemEntity)
        .all(conn)
        .await?;

    let customer_names: HashMap<i32, String> = CustomerEntity::find()
        .filter(customer::Column::Id.is_in(customer_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut lines_by_order: HashMap<i32, Vec<OrderLineView>> = HashMap::new();
    for (line, item) in lines {
        let name = item.map(|i| i.name).unwrap_or_default();
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderLineView::new(line, name));
    }

    Ok(orders
        .into_iter()
        .map(|o| {
            let name = customer_names.get(&o.customer_id).cloned().unwrap_or_default();
            let lines = lines_by_order.remove(&o.id).unwrap_or_default();
            OrderView::assemble(o, name, lines)
        })
        .collect())
}

/// Service for taking orders and reading them back
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    write_gate: WriteGate,
    event_sender: EventSender,
    kitchen_feed: KitchenFeed,
    stock_policy: StockPolicy,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        write_gate: WriteGate,
        event_sender: EventSender,
        kitchen_feed: KitchenFeed,
        stock_policy: StockPolicy,
    ) -> Self {
        Self {
            db_pool,
            write_gate,
            event_sender,
            kitchen_feed,
            stock_policy,
        }
    }

    /// Places an order stamped with the local wall clock.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<OrderReceipt, ServiceError> {
        self.place_order_at(request, Local::now().naive_local()).await
    }

    /// Places an order as one unit of work.
    ///
    /// The customer is resolved (or created by phone), the order and its
    /// lines are written, and every ingredient the lines need is consumed
    /// from inventory. Either all of it commits or none of it does. A
    /// repeated idempotency key with the same request returns the first
    /// order with `replayed` set; with a different request it is a conflict.
    #[instrument(skip(self, request), fields(order_type = %request.order_type, lines = request.lines.len()))]
    pub async fn place_order_at(
        &self,
        request: PlaceOrderRequest,
        at: NaiveDateTime,
    ) -> Result<OrderReceipt, ServiceError> {
        with_metrics("orders.place", || self.place(request, at)).await
    }

    async fn place(
        &self,
        request: PlaceOrderRequest,
        at: NaiveDateTime,
    ) -> Result<OrderReceipt, ServiceError> {
        let employee_id = request
            .employee_id
            .ok_or_else(|| invalid("", "employee_id", "required when not signed in"))?;
        validate_cart(&request)?;
        let key = request
            .idempotency_key
            .as_deref()
            .map(IdempotencyKey::parse)
            .transpose()?;
        let fingerprint = request_fingerprint(&request, employee_id)?;

        let mut attempt = 1;
        let outcome = loop {
            match self
                .try_place(&request, employee_id, key.as_deref(), &fingerprint, at)
                .await
            {
                Err(e) if e.is_lock_contention() && attempt < PLACE_ATTEMPTS => {
                    warn!(attempt, error = %e, "order placement lost a write lock, retrying");
                    counter!("feathers.orders.place_retries", 1);
                    tokio::time::sleep(Duration::from_millis(25 * attempt as u64)).await;
                    attempt += 1;
                }
                other => break other?,
            }
        };

        match outcome {
            Attempt::Done(receipt) => Ok(*receipt),
            Attempt::LostRace => {
                let key = key.ok_or_else(|| {
                    ServiceError::InternalError("lost an idempotency race without a key".into())
                })?;
                let existing = OrderEntity::find()
                    .filter(order::Column::IdempotencyKey.eq(key.as_str()))
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!("order for key {} vanished", key))
                    })?;
                self.replay(&*self.db_pool, existing, &key, &fingerprint).await
            }
        }
    }

    async fn try_place(
        &self,
        request: &PlaceOrderRequest,
        employee_id: i32,
        key: Option<&str>,
        fingerprint: &str,
        at: NaiveDateTime,
    ) -> Result<Attempt, ServiceError> {
        let _write = self.write_gate.enter().await;
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        if let Some(key) = key {
            let existing = OrderEntity::find()
                .filter(order::Column::IdempotencyKey.eq(key))
                .one(&txn)
                .await?;
            if let Some(existing) = existing {
                let receipt = self.replay(&txn, existing, key, fingerprint).await?;
                txn.commit().await?;
                return Ok(Attempt::Done(Box::new(receipt)));
            }
        }

        let customer = match &request.customer {
            CustomerRef::Existing { customer_id } => CustomerEntity::find_by_id(*customer_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?,
            CustomerRef::New(new) => resolve_by_phone(&txn, new).await?,
        };

        EmployeeEntity::find_by_id(employee_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Employee {} not found", employee_id)))?;

        let menu_ids: Vec<i32> = request
            .lines
            .iter()
            .map(|l| l.menu_item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let menu: HashMap<i32, menu_item::Model> = MenuItemEntity::find()
            .filter(menu_item::Column::Id.is_in(menu_ids.clone()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let missing: Vec<String> = menu_ids
            .iter()
            .filter(|id| !menu.contains_key(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Menu item(s) {} not found",
                missing.join(", ")
            )));
        }

        let priced: Vec<PricedLine> = request
            .lines
            .iter()
            .map(|l| PricedLine {
                menu_item_id: l.menu_item_id,
                quantity: l.quantity,
                unit_price: money(
                    l.unit_price
                        .or_else(|| menu.get(&l.menu_item_id).map(|m| m.price))
                        .unwrap_or_default(),
                ),
                modifications: l.modifications.as_deref().unwrap_or("").trim().to_string(),
            })
            .collect();
        let total = cart_total(&priced);
        if let Some(claimed) = request.total {
            if money(claimed) != total {
                return Err(invalid(
                    "",
                    "total",
                    &format!("{} does not match the line sum {}", money(claimed), total),
                ));
            }
        }

        let inserted = order::ActiveModel {
            customer_id: Set(customer.id),
            employee_id: Set(employee_id),
            order_date: Set(at.date()),
            order_time: Set(at.time().with_nanosecond(0).unwrap_or_else(|| at.time())),
            order_type: Set(request.order_type),
            total_amount: Set(total),
            idempotency_key: Set(key.map(str::to_string)),
            request_fingerprint: Set(key.map(|_| fingerprint.to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await;
        let created = match inserted {
            Ok(created) => created,
            Err(e) if key.is_some() && ServiceError::is_unique_violation(&e) => {
                return Ok(Attempt::LostRace);
            }
            Err(e) => {
                error!(error = %e, "Failed to insert order");
                return Err(ServiceError::DatabaseError(e));
            }
        };

        OrderItemEntity::insert_many(priced.iter().map(|l| order_item::ActiveModel {
            order_id: Set(created.id),
            menu_item_id: Set(l.menu_item_id),
            quantity: Set(l.quantity),
            unit_price: Set(l.unit_price),
            modifications: Set(l.modifications.clone()),
            ..Default::default()
        }))
        .exec_without_returning(&txn)
        .await?;

        let recipes = recipes_for(&txn, menu_ids).await?;
        let pairs: Vec<(i32, i32)> = priced.iter().map(|l| (l.menu_item_id, l.quantity)).collect();
        let needs = aggregate_needs(&pairs, &recipes)?;
        let consumption = consume(&txn, &needs, self.stock_policy).await?;

        let stored_lines = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(created.id))
            .order_by_asc(order_item::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order placement");
            ServiceError::DatabaseError(e)
        })?;

        self.kitchen_feed.bump();
        counter!("feathers.orders.placed", 1, "order_type" => request.order_type.to_string());
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: created.id,
                customer_id: customer.id,
                total_amount: total,
                line_count: stored_lines.len(),
                at: Utc::now(),
            })
            .await;
        for event in consumption.negative_stock_events() {
            self.event_sender.send_or_log(event).await;
        }

        let lines = stored_lines
            .into_iter()
            .map(|line| {
                let name = menu
                    .get(&line.menu_item_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                OrderLineView::new(line, name)
            })
            .collect();

        info!(order_id = created.id, total = %total, "order placed");
        Ok(Attempt::Done(Box::new(OrderReceipt {
            order: OrderView::assemble(created, customer.name, lines),
            inventory_changes: consumption.changes,
            warnings: consumption.warnings,
            replayed: false,
        })))
    }

    async fn replay<C>(
        &self,
        conn: &C,
        existing: order::Model,
        key: &str,
        fingerprint: &str,
    ) -> Result<OrderReceipt, ServiceError>
    where
        C: ConnectionTrait,
    {
        if existing.request_fingerprint.as_deref() != Some(fingerprint) {
            return Err(ServiceError::Conflict(format!(
                "Idempotency key {} was already used for a different order",
                key
            )));
        }

        let order_id = existing.id;
        let order = load_views(conn, vec![existing])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError(format!("order {} vanished", order_id)))?;

        counter!("feathers.orders.replayed", 1);
        info!(order_id, "idempotent replay");
        Ok(OrderReceipt {
            order,
            inventory_changes: Vec::new(),
            warnings: Vec::new(),
            replayed: true,
        })
    }

    /// Appends a line to an open order, consuming its ingredients and
    /// raising the order total in the same transaction.
    #[instrument(skip(self, line), fields(menu_item_id = line.menu_item_id))]
    pub async fn add_line(
        &self,
        order_id: i32,
        line: OrderLineRequest,
    ) -> Result<OrderReceipt, ServiceError> {
        validate_line("", &line)?;

        let _write = self.write_gate.enter().await;
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.is_done {
            return Err(ServiceError::ValidationError(format!(
                "order_id: order {} is already done",
                order_id
            )));
        }

        let item = MenuItemEntity::find_by_id(line.menu_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Menu item(s) {} not found", line.menu_item_id))
            })?;
        let unit_price = money(line.unit_price.unwrap_or(item.price));

        order_item::ActiveModel {
            order_id: Set(order_id),
            menu_item_id: Set(item.id),
            quantity: Set(line.quantity),
            unit_price: Set(unit_price),
            modifications: Set(line.modifications.as_deref().unwrap_or("").trim().to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let recipes = recipes_for(&txn, vec![item.id]).await?;
        let needs = aggregate_needs(&[(item.id, line.quantity)], &recipes)?;
        let consumption = consume(&txn, &needs, self.stock_policy).await?;

        let all_lines = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let total = money(
            all_lines
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum(),
        );
        let mut active: order::ActiveModel = order.into();
        active.total_amount = Set(total);
        let updated = active.update(&txn).await?;

        let view = load_views(&txn, vec![updated])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError(format!("order {} vanished", order_id)))?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit order line");
            ServiceError::DatabaseError(e)
        })?;

        self.kitchen_feed.bump();
        self.event_sender
            .send_or_log(Event::OrderLineAdded {
                order_id,
                menu_item_id: item.id,
                quantity: line.quantity,
            })
            .await;
        for event in consumption.negative_stock_events() {
            self.event_sender.send_or_log(event).await;
        }

        info!(order_id, total = %total, "order line added");
        Ok(OrderReceipt {
            order: view,
            inventory_changes: consumption.changes,
            warnings: consumption.warnings,
            replayed: false,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderView, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        load_views(&*self.db_pool, vec![order])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError(format!("order {} vanished", order_id)))
    }

    /// Lines of one order in the shape the kitchen screen prints them
    #[instrument(skip(self))]
    pub async fn order_lines(&self, order_id: i32) -> Result<Vec<KitchenLineView>, ServiceError> {
        let order = self.get_order(order_id).await?;
        Ok(order
            .lines
            .iter()
            .map(|line| KitchenLineView {
                order_id: order.id,
                customer_name: order.customer_name.clone(),
                order_date: order.order_date,
                order_time: order.order_time,
                order_type: order.order_type,
                menu_item_id: line.menu_item_id,
                item_name: line.menu_item_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                modifications: line.modifications.clone(),
            })
            .collect())
    }

    /// Orders finished on `date`, oldest first
    #[instrument(skip(self))]
    pub async fn completed_orders(&self, date: NaiveDate) -> Result<Vec<OrderView>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::IsDone.eq(true))
            .filter(order::Column::OrderDate.eq(date))
            .order_by_asc(order::Column::OrderTime)
            .order_by_asc(order::Column::Id)
            .all(&*self.db_pool)
            .await?;
        load_views(&*self.db_pool, orders).await
    }
}
