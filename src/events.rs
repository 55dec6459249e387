use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Domain events emitted by the services. Delivery is best-effort: a full or
/// closed channel is logged by the sender and never fails the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(i64),
    OrderStatusChanged {
        order_id: i64,
        old_status: String,
        new_status: String,
    },
    OrderDeleted(i64),
    PaymentCreated(i64),
    PaymentStatusChanged {
        payment_id: i64,
        order_id: i64,
        new_status: String,
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
            .map_err(|e| format!("failed to send event: {}", e))
    }
}

/// Background consumer: drains the channel and logs each event.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => info!(order_id, "order created"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(order_id, %old_status, %new_status, "order status changed"),
            Event::OrderDeleted(order_id) => info!(order_id, "order deleted"),
            Event::PaymentCreated(payment_id) => info!(payment_id, "payment created"),
            Event::PaymentStatusChanged {
                payment_id,
                order_id,
                new_status,
            } => info!(payment_id, order_id, %new_status, "payment status changed"),
        }
    }
}
