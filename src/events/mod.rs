use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the checkout pipeline. Consumers (e.g. a
/// notification dispatcher) attach to the processing loop; emission is
/// one-way and never blocks or retries on behalf of a consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutStarted {
        session_id: Uuid,
        product_id: Uuid,
    },
    LeadCaptured {
        lead_id: Uuid,
        product_id: Uuid,
        step: u8,
    },
    PaymentInitiated {
        transaction_id: Uuid,
        amount: i64,
    },
    PaymentApproved {
        transaction_id: Uuid,
    },
    PaymentRejected {
        transaction_id: Uuid,
    },
    PaymentRefunded {
        transaction_id: Uuid,
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

    /// Sends an event, logging on failure. The pipeline must keep moving
    /// even if the processing loop is gone.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Processes incoming events. This is the attachment point for downstream
/// notification delivery, which is outside the pipeline's scope.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::CheckoutStarted {
                session_id,
                product_id,
            } => {
                info!(%session_id, %product_id, "checkout session started");
            }
            Event::LeadCaptured {
                lead_id,
                product_id,
                step,
            } => {
                info!(%lead_id, %product_id, step, "lead captured");
            }
            Event::PaymentInitiated {
                transaction_id,
                amount,
            } => {
                info!(%transaction_id, amount, "payment intent created");
            }
            Event::PaymentApproved { transaction_id } => {
                info!(%transaction_id, "payment approved");
            }
            Event::PaymentRejected { transaction_id } => {
                warn!(%transaction_id, "payment rejected");
            }
            Event::PaymentRefunded { transaction_id } => {
                info!(%transaction_id, "payment refunded");
            }
        }
    }

    warn!("Event processing loop has ended");
}
