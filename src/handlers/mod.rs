pub mod analytics;
pub mod customers;
pub mod employees;
pub mod inventory;
pub mod kitchen;
pub mod menu;
pub mod orders;
pub mod sessions;

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::AppConfig,
    db::{DbPool, WriteGate},
    errors::ServiceError,
    events::{EventSender, KitchenFeed},
    services::{
        analytics::AnalyticsService, catalog::CatalogService, customers::CustomerService,
        employees::EmployeeService, inventory::InventoryService, kitchen::KitchenService,
        order_status::OrderStatusService, orders::OrderService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub inventory: Arc<InventoryService>,
    pub employees: Arc<EmployeeService>,
    pub customers: Arc<CustomerService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub kitchen: Arc<KitchenService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        kitchen_feed: KitchenFeed,
        config: &AppConfig,
    ) -> Self {
        let stock_policy = config.stock_policy;
        let write_gate = WriteGate::for_pool(&db_pool);

        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone(), write_gate.clone())),
            inventory: Arc::new(InventoryService::new(
                db_pool.clone(),
                write_gate.clone(),
                event_sender.clone(),
                stock_policy,
            )),
            employees: Arc::new(EmployeeService::new(db_pool.clone())),
            customers: Arc::new(CustomerService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                write_gate,
                event_sender.clone(),
                kitchen_feed.clone(),
                stock_policy,
            )),
            order_status: Arc::new(OrderStatusService::new(
                db_pool.clone(),
                event_sender,
                kitchen_feed.clone(),
            )),
            kitchen: Arc::new(KitchenService::new(
                db_pool.clone(),
                kitchen_feed,
                Duration::from_secs(config.kitchen_poll_max_wait_secs),
            )),
            analytics: Arc::new(AnalyticsService::new(db_pool)),
        }
    }
}

/// Parses a `YYYY-MM-DD` query value.
pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ServiceError::ValidationError(format!("{}: expected YYYY-MM-DD, got {:?}", field, raw))
    })
}

/// Parses a `YYYY-MM-DDTHH:MM:SS` query value; a space separator is accepted too.
pub(crate) fn parse_date_time(field: &str, raw: &str) -> Result<NaiveDateTime, ServiceError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| {
            ServiceError::ValidationError(format!(
                "{}: expected YYYY-MM-DDTHH:MM:SS, got {:?}",
                field, raw
            ))
        })
}
