use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    errors::ServiceError,
    events::KitchenFeed,
    services::orders::{load_views, OrderView},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

/// Query for the kitchen long-poll
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Last version the screen has rendered; the call waits for a newer one
    pub since: Option<u64>,
    /// Seconds to wait for a change, capped by configuration
    pub wait_secs: Option<u64>,
    /// Highest order id the screen already knows about
    pub after_order_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KitchenSnapshot {
    pub version: u64,
    pub orders: Vec<OrderView>,
    /// Open orders with an id above `after_order_id`, oldest first
    pub new_order_ids: Vec<i32>,
}

/// Read side of the kitchen display
#[derive(Clone)]
pub struct KitchenService {
    db_pool: Arc<DbPool>,
    kitchen_feed: KitchenFeed,
    max_wait: Duration,
}

impl KitchenService {
    pub fn new(db_pool: Arc<DbPool>, kitchen_feed: KitchenFeed, max_wait: Duration) -> Self {
        Self {
            db_pool,
            kitchen_feed,
            max_wait,
        }
    }

    /// Every order not yet done, by date, then time, then id
    #[instrument(skip(self))]
    pub async fn open_orders(&self) -> Result<Vec<OrderView>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::IsDone.eq(false))
            .order_by_asc(order::Column::OrderDate)
            .order_by_asc(order::Column::OrderTime)
            .order_by_asc(order::Column::Id)
            .all(&*self.db_pool)
            .await?;
        load_views(&*self.db_pool, orders).await
    }

    /// Returns the open orders, first waiting up to `wait_secs` for the feed
    /// to move past `since` when a version is given.
    ///
    /// The version is read before the orders, so a change racing with the
    /// read is reported again on the next poll rather than lost.
    #[instrument(skip(self))]
    pub async fn poll(&self, query: FeedQuery) -> Result<KitchenSnapshot, ServiceError> {
        let version = match query.since {
            Some(since) => {
                let wait = query
                    .wait_secs
                    .map(Duration::from_secs)
                    .unwrap_or(self.max_wait)
                    .min(self.max_wait);
                self.kitchen_feed.wait_past(since, wait).await
            }
            None => self.kitchen_feed.version(),
        };

        let orders = self.open_orders().await?;
        let new_order_ids = match query.after_order_id {
            Some(after) => orders.iter().map(|o| o.id).filter(|id| *id > after).collect(),
            None => Vec::new(),
        };

        debug!(version, open = orders.len(), "kitchen poll answered");
        Ok(KitchenSnapshot {
            version,
            orders,
            new_order_ids,
        })
    }
}
