use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        order::{self, OrderStatus},
        Order, OrderModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::activity_log::{ActivityEntry, ActivityLogService, RequestMeta},
};

/// Admin-facing order status state machine.
///
/// Transition legality lives on [`OrderStatus::can_transition_to`]. Status
/// and timestamp columns are updated together in one statement; there is no
/// multi-row invariant here, so no transaction is taken.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    activity_log: Arc<ActivityLogService>,
}

impl OrderStatusService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        activity_log: Arc<ActivityLogService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            activity_log,
        }
    }

    #[instrument(skip(self, meta), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        admin_id: Uuid,
        meta: RequestMeta,
    ) -> Result<OrderModel, ServiceError> {
        let current = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let old_status = current.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "cannot move order from '{old_status}' to '{new_status}'"
            )));
        }

        if old_status == new_status {
            return Ok(current);
        }

        let now = Utc::now();
        let mut active: order::ActiveModel = current.clone().into();
        active.status = Set(new_status);
        active.updated_at = Set(now);
        if new_status == OrderStatus::Shipped && current.shipped_at.is_none() {
            active.shipped_at = Set(Some(now));
        }
        if new_status == OrderStatus::Delivered && current.delivered_at.is_none() {
            active.delivered_at = Set(Some(now));
        }
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;
        self.activity_log
            .record(ActivityEntry {
                admin_id: Some(admin_id),
                user_id: None,
                action: "order_status_updated".into(),
                entity_type: "order".into(),
                entity_id: Some(order_id),
                old_value: Some(json!({ "status": old_status.as_str() })),
                new_value: Some(json!({ "status": new_status.as_str() })),
                meta,
            })
            .await;

        info!(%order_id, %old_status, %new_status, "order status updated");
        Ok(updated)
    }

    /// Attach a tracking number; the order is forced to `shipped` and the
    /// shipped-at timestamp is stamped if not already set.
    #[instrument(skip(self, meta), fields(order_id = %order_id))]
    pub async fn add_tracking(
        &self,
        order_id: Uuid,
        tracking_number: String,
        admin_id: Uuid,
        meta: RequestMeta,
    ) -> Result<OrderModel, ServiceError> {
        if tracking_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Tracking number is required".into(),
            ));
        }

        let current = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let old_status = current.status;
        let now = Utc::now();
        let mut active: order::ActiveModel = current.clone().into();
        active.tracking_number = Set(Some(tracking_number.clone()));
        active.status = Set(OrderStatus::Shipped);
        active.updated_at = Set(now);
        if current.shipped_at.is_none() {
            active.shipped_at = Set(Some(now));
        }
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::TrackingNumberAdded {
                order_id,
                tracking_number: tracking_number.clone(),
            })
            .await;
        self.activity_log
            .record(ActivityEntry {
                admin_id: Some(admin_id),
                user_id: None,
                action: "order_tracking_added".into(),
                entity_type: "order".into(),
                entity_id: Some(order_id),
                old_value: Some(json!({ "status": old_status.as_str() })),
                new_value: Some(json!({
                    "status": OrderStatus::Shipped.as_str(),
                    "tracking_number": tracking_number,
                })),
                meta,
            })
            .await;

        info!(%order_id, "tracking number added, order marked shipped");
        Ok(updated)
    }
}
