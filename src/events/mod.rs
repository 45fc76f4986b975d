use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends after a commit; a closed channel is logged, never surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "domain event dropped");
        }
    }
}

/// Facts published after a unit of work has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: i32,
        customer_id: i32,
        total_amount: Decimal,
        line_count: usize,
        at: DateTime<Utc>,
    },
    OrderLineAdded {
        order_id: i32,
        menu_item_id: i32,
        quantity: i32,
    },
    OrderCompleted(i32),
    InventoryAdjusted {
        inventory_item_id: i32,
        old_quantity: i32,
        new_quantity: i32,
        reason: String,
    },
    StockWentNegative {
        inventory_item_id: i32,
        name: String,
        quantity: i32,
    },
}

/// Drains the event channel, logging each fact and counting it.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPlaced {
                order_id,
                total_amount,
                line_count,
                ..
            } => {
                info!(order_id, %total_amount, line_count, "order placed");
            }
            Event::OrderLineAdded {
                order_id,
                menu_item_id,
                quantity,
            } => {
                info!(order_id, menu_item_id, quantity, "line added to open order");
            }
            Event::OrderCompleted(order_id) => {
                counter!("feathers.orders.completed", 1);
                info!(order_id, "order completed");
            }
            Event::InventoryAdjusted {
                inventory_item_id,
                old_quantity,
                new_quantity,
                reason,
            } => {
                info!(
                    inventory_item_id,
                    old_quantity,
                    new_quantity,
                    reason = %reason,
                    "inventory adjusted"
                );
            }
            Event::StockWentNegative {
                inventory_item_id,
                name,
                quantity,
            } => {
                counter!("feathers.inventory.negative", 1);
                warn!(inventory_item_id, name = %name, quantity, "stock below zero");
            }
        }
    }

    info!("Event channel closed, processor exiting");
}

/// Version counter for the kitchen display.
///
/// Bumped after every committed change to the set of open orders so that
/// pollers can wait for a change instead of rescanning on a timer.
#[derive(Debug, Clone)]
pub struct KitchenFeed {
    sender: watch::Sender<u64>,
}

impl Default for KitchenFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl KitchenFeed {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self { sender }
    }

    pub fn version(&self) -> u64 {
        *self.sender.borrow()
    }

    /// Marks the open-order set as changed and returns the new version.
    pub fn bump(&self) -> u64 {
        self.sender.send_modify(|v| *v += 1);
        self.version()
    }

    /// Resolves once the version moves past `since`, or after `timeout`.
    /// Returns the version current at that point.
    pub async fn wait_past(&self, since: u64, timeout: Duration) -> u64 {
        let mut rx = self.sender.subscribe();
        if *rx.borrow_and_update() > since {
            return *rx.borrow();
        }
        let _ = tokio::time::timeout(timeout, rx.wait_for(|v| *v > since)).await;
        self.version()
    }
}
