use std::sync::Arc;

use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    errors::ServiceError,
    events::{Event, EventSender, KitchenFeed},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompletionOutcome {
    pub order_id: i32,
    pub is_done: bool,
    /// False when the order had already been marked done
    pub transitioned: bool,
}

/// Moves orders from the kitchen queue to done
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    kitchen_feed: KitchenFeed,
}

impl OrderStatusService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, kitchen_feed: KitchenFeed) -> Self {
        Self {
            db,
            event_sender,
            kitchen_feed,
        }
    }

    /// Marks an order done. Repeating the call is a no-op that reports
    /// `transitioned: false`.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn mark_done(&self, order_id: i32) -> Result<CompletionOutcome, ServiceError> {
        let result = OrderEntity::update_many()
            .col_expr(order::Column::IsDone, Expr::value(true))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::IsDone.eq(false))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            let exists = OrderEntity::find_by_id(order_id).one(&*self.db).await?;
            if exists.is_none() {
                return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
            }
            info!("order already done");
            return Ok(CompletionOutcome {
                order_id,
                is_done: true,
                transitioned: false,
            });
        }

        self.kitchen_feed.bump();
        self.event_sender
            .send_or_log(Event::OrderCompleted(order_id))
            .await;

        info!("order marked done");
        Ok(CompletionOutcome {
            order_id,
            is_done: true,
            transitioned: true,
        })
    }
}
