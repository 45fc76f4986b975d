use crate::{
    db::DbPool,
    entities::{
        customer::{self, Entity as CustomerEntity},
        employee::{self, Entity as EmployeeEntity},
        inventory_item::{self, Entity as InventoryItemEntity},
        menu_item::{self, Entity as MenuItemEntity},
        order::{self, Entity as OrderEntity},
        order_item::{self, Entity as OrderItemEntity},
    },
    errors::ServiceError,
    services::{catalog::recipes_for, money},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

const TOP_N: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomerOrderCount {
    pub customer_id: i32,
    pub name: String,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemPopularity {
    pub menu_item_id: i32,
    pub name: String,
    /// Number of order lines naming the item
    pub times_ordered: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeOrderCount {
    pub employee_id: i32,
    pub name: String,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SalesSummary {
    pub total_sales: Decimal,
    pub top_customers: Vec<CustomerOrderCount>,
    pub top_items: Vec<ItemPopularity>,
    pub employee_order_counts: Vec<EmployeeOrderCount>,
    /// Hour of day (0-23) with the most orders; `None` before the first sale
    pub peak_hour: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngredientUsage {
    pub inventory_item_id: i32,
    pub inventory_item: String,
    pub total_used: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HourlySales {
    pub hour: u32,
    pub order_count: u64,
    pub total: Decimal,
}

/// End-of-shift reading for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct XReport {
    pub date: NaiveDate,
    pub order_count: u64,
    pub total_sales: Decimal,
    pub hourly: Vec<HourlySales>,
}

/// Most frequent hour; ties go to the earlier hour.
fn peak_hour(times: &[NaiveTime]) -> Option<u32> {
    let mut per_hour: BTreeMap<u32, u64> = BTreeMap::new();
    for time in times {
        *per_hour.entry(time.hour()).or_default() += 1;
    }
    per_hour
        .into_iter()
        .fold(None, |best: Option<(u32, u64)>, (hour, count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((hour, count)),
        })
        .map(|(hour, _)| hour)
}

fn bucket_by_hour(rows: &[(NaiveTime, Decimal)]) -> Vec<HourlySales> {
    let mut buckets: BTreeMap<u32, (u64, Decimal)> = BTreeMap::new();
    for (time, amount) in rows {
        let entry = buckets.entry(time.hour()).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += *amount;
    }
    buckets
        .into_iter()
        .map(|(hour, (order_count, total))| HourlySales {
            hour,
            order_count,
            total: money(total),
        })
        .collect()
}

/// Read-only sales reporting. Every report is computed from the orders and
/// lines as stored; an empty store yields zeros and empty lists.
#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<SalesSummary, ServiceError> {
        let db = &*self.db_pool;

        let totals: Vec<Decimal> = OrderEntity::find()
            .select_only()
            .column(order::Column::TotalAmount)
            .into_tuple()
            .all(db)
            .await?;
        let total_sales = money(totals.into_iter().sum());

        let customer_counts: Vec<(i32, i64)> = OrderEntity::find()
            .select_only()
            .column(order::Column::CustomerId)
            .column_as(order::Column::Id.count(), "order_count")
            .group_by(order::Column::CustomerId)
            .order_by_desc(order::Column::Id.count())
            .order_by_asc(order::Column::CustomerId)
            .limit(TOP_N)
            .into_tuple()
            .all(db)
            .await?;
        let customer_names: HashMap<i32, String> = CustomerEntity::find()
            .filter(customer::Column::Id.is_in(customer_counts.iter().map(|(id, _)| *id)))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let top_customers = customer_counts
            .into_iter()
            .map(|(customer_id, order_count)| CustomerOrderCount {
                customer_id,
                name: customer_names.get(&customer_id).cloned().unwrap_or_default(),
                order_count,
            })
            .collect();

        let item_counts: Vec<(i32, i64)> = OrderItemEntity::find()
            .select_only()
            .column(order_item::Column::MenuItemId)
            .column_as(order_item::Column::Id.count(), "times_ordered")
            .group_by(order_item::Column::MenuItemId)
            .order_by_desc(order_item::Column::Id.count())
            .order_by_asc(order_item::Column::MenuItemId)
            .limit(TOP_N)
            .into_tuple()
            .all(db)
            .await?;
        let item_names: HashMap<i32, String> = MenuItemEntity::find()
            .filter(menu_item::Column::Id.is_in(item_counts.iter().map(|(id, _)| *id)))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();
        let top_items = item_counts
            .into_iter()
            .map(|(menu_item_id, times_ordered)| ItemPopularity {
                menu_item_id,
                name: item_names.get(&menu_item_id).cloned().unwrap_or_default(),
                times_ordered,
            })
            .collect();

        let per_employee: HashMap<i32, i64> = OrderEntity::find()
            .select_only()
            .column(order::Column::EmployeeId)
            .column_as(order::Column::Id.count(), "order_count")
            .group_by(order::Column::EmployeeId)
            .into_tuple::<(i32, i64)>()
            .all(db)
            .await?
            .into_iter()
            .collect();
        let mut employee_order_counts: Vec<EmployeeOrderCount> = EmployeeEntity::find()
            .order_by_asc(employee::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|e| EmployeeOrderCount {
                employee_id: e.id,
                order_count: per_employee.get(&e.id).copied().unwrap_or(0),
                name: e.name,
            })
            .collect();
        employee_order_counts.sort_by(|a, b| {
            b.order_count
                .cmp(&a.order_count)
                .then(a.employee_id.cmp(&b.employee_id))
        });

        let times: Vec<NaiveTime> = OrderEntity::find()
            .select_only()
            .column(order::Column::OrderTime)
            .into_tuple()
            .all(db)
            .await?;

        Ok(SalesSummary {
            total_sales,
            top_customers,
            top_items,
            employee_order_counts,
            peak_hour: peak_hour(&times),
        })
    }

    /// Sales per hour of `date`; hours without orders are absent.
    #[instrument(skip(self))]
    pub async fn sales_per_hour(&self, date: NaiveDate) -> Result<BTreeMap<u32, Decimal>, ServiceError> {
        let rows = self.day_sales(date).await?;
        Ok(bucket_by_hour(&rows)
            .into_iter()
            .map(|h| (h.hour, h.total))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn x_report(&self, date: NaiveDate) -> Result<XReport, ServiceError> {
        let rows = self.day_sales(date).await?;
        let total_sales = money(rows.iter().map(|(_, amount)| *amount).sum());
        Ok(XReport {
            date,
            order_count: rows.len() as u64,
            total_sales,
            hourly: bucket_by_hour(&rows),
        })
    }

    /// Ingredient units consumed by orders placed within `[start, end]`,
    /// largest first.
    #[instrument(skip(self))]
    pub async fn product_usage(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<IngredientUsage>, ServiceError> {
        if start > end {
            return Err(ServiceError::ValidationError(format!(
                "start: {} is after end {}",
                start, end
            )));
        }
        let db = &*self.db_pool;

        let candidates: Vec<(i32, NaiveDate, NaiveTime)> = OrderEntity::find()
            .select_only()
            .column(order::Column::Id)
            .column(order::Column::OrderDate)
            .column(order::Column::OrderTime)
            .filter(order::Column::OrderDate.between(start.date(), end.date()))
            .into_tuple()
            .all(db)
            .await?;
        let order_ids: Vec<i32> = candidates
            .into_iter()
            .filter(|(_, date, time)| {
                let at = date.and_time(*time);
                at >= start && at <= end
            })
            .map(|(id, _, _)| id)
            .collect();
        if order_ids.is_empty() {
            debug!("no orders in range");
            return Ok(Vec::new());
        }

        let lines: Vec<(i32, i32)> = OrderItemEntity::find()
            .select_only()
            .column(order_item::Column::MenuItemId)
            .column(order_item::Column::Quantity)
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .into_tuple()
            .all(db)
            .await?;

        let mut sold: BTreeMap<i32, i64> = BTreeMap::new();
        for (menu_item_id, quantity) in lines {
            *sold.entry(menu_item_id).or_default() += i64::from(quantity);
        }
        let recipes = recipes_for(db, sold.keys().copied().collect()).await?;

        let mut used: BTreeMap<i32, i64> = BTreeMap::new();
        for (menu_item_id, quantity) in &sold {
            for ingredient in recipes.get(menu_item_id).into_iter().flatten() {
                *used.entry(ingredient.inventory_item_id).or_default() +=
                    i64::from(ingredient.quantity_needed) * quantity;
            }
        }

        let names: HashMap<i32, String> = InventoryItemEntity::find()
            .filter(inventory_item::Column::Id.is_in(used.keys().copied()))
            .all(db)
            .await?
            .into_iter()
            .map(|i| (i.id, i.name))
            .collect();

        let mut usage: Vec<IngredientUsage> = used
            .into_iter()
            .map(|(inventory_item_id, total_used)| IngredientUsage {
                inventory_item_id,
                inventory_item: names.get(&inventory_item_id).cloned().unwrap_or_default(),
                total_used,
            })
            .collect();
        usage.sort_by(|a, b| {
            b.total_used
                .cmp(&a.total_used)
                .then_with(|| a.inventory_item.cmp(&b.inventory_item))
        });
        Ok(usage)
    }

    async fn day_sales(&self, date: NaiveDate) -> Result<Vec<(NaiveTime, Decimal)>, ServiceError> {
        let rows = OrderEntity::find()
            .select_only()
            .column(order::Column::OrderTime)
            .column(order::Column::TotalAmount)
            .filter(order::Column::OrderDate.eq(date))
            .into_tuple()
            .all(&*self.db_pool)
            .await?;
        Ok(rows)
    }
}
