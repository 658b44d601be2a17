use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::OrderStatus;

/// Domain events emitted after state changes commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    TrackingNumberAdded {
        order_id: Uuid,
        tracking_number: String,
    },
    CartItemAdded {
        user_id: Uuid,
        variant_id: Uuid,
    },
    CartCleared(Uuid),
    StockDepleted {
        variant_id: Uuid,
    },
    UserRegistered(Uuid),
    UserModerated {
        user_id: Uuid,
        is_active: bool,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Send an event, logging instead of failing if the channel is closed.
    /// Event delivery is best-effort; a dropped event never affects the
    /// business operation that produced it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("event dropped: {e}");
        }
    }
}

/// Background consumer for the event channel. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(%order_id, "event: order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "event: order status changed");
            }
            other => {
                info!(event = ?other, "event");
            }
        }
    }
    info!("event channel closed; processor exiting");
}

/// Convenience constructor for a sender/processor pair.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}
