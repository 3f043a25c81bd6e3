//! Settlement reconciliation: maps asynchronous PSP webhook payloads onto
//! authoritative local transaction state, idempotently.

use crate::entities::transaction::TransactionStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::transactions::TransactionService;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A named field-extraction strategy. PSPs are inconsistent about field
/// naming, so extraction is an ordered chain of strategies tried in
/// sequence rather than ad hoc string matching.
struct FieldExtractor {
    name: &'static str,
    key: &'static str,
}

impl FieldExtractor {
    fn extract(&self, payload: &Value) -> Option<String> {
        match payload.get(self.key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

const TRANSACTION_ID_EXTRACTORS: &[FieldExtractor] = &[
    FieldExtractor {
        name: "camel-case id",
        key: "transactionId",
    },
    FieldExtractor {
        name: "snake-case id",
        key: "transaction_id",
    },
    FieldExtractor {
        name: "bare id",
        key: "id",
    },
];

const STATUS_EXTRACTORS: &[FieldExtractor] = &[
    FieldExtractor {
        name: "status",
        key: "status",
    },
    FieldExtractor {
        name: "camel-case payment status",
        key: "paymentStatus",
    },
    FieldExtractor {
        name: "snake-case payment status",
        key: "payment_status",
    },
];

fn extract_first(extractors: &[FieldExtractor], payload: &Value) -> Option<String> {
    extractors.iter().find_map(|e| {
        let value = e.extract(payload)?;
        info!(strategy = e.name, "webhook field matched");
        Some(value)
    })
}

/// Map the PSP status vocabulary onto the internal three-outcome one.
/// Unknown values map to `None`: intermediate PSP states are expected and
/// leave the transaction pending.
fn map_psp_status(raw: &str) -> Option<TransactionStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "confirmed" | "paid" | "completed" | "approved" => Some(TransactionStatus::Approved),
        "failed" | "rejected" | "refused" => Some(TransactionStatus::Rejected),
        _ => None,
    }
}

/// What reconciliation did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The transaction moved to a new status
    Applied(TransactionStatus),
    /// Duplicate or stale delivery; stored state already matches
    NoChange,
    /// Intermediate PSP status with no local mapping
    Ignored,
}

#[derive(Clone)]
pub struct ReconciliationService {
    transactions: Arc<TransactionService>,
    events: EventSender,
}

impl ReconciliationService {
    pub fn new(transactions: Arc<TransactionService>, events: EventSender) -> Self {
        Self {
            transactions,
            events,
        }
    }

    /// Apply one webhook delivery. Safe to call with duplicate and
    /// out-of-order deliveries for the same transaction; a webhook can
    /// never originate a transaction.
    #[instrument(skip(self, payload))]
    pub async fn reconcile(&self, payload: &Value) -> Result<ReconcileOutcome, ServiceError> {
        let reference = extract_first(TRANSACTION_ID_EXTRACTORS, payload).ok_or_else(|| {
            ServiceError::MalformedWebhook(
                "payload carries no recognizable transaction identifier".into(),
            )
        })?;

        let Some(raw_status) = extract_first(STATUS_EXTRACTORS, payload) else {
            info!(%reference, "webhook carried no status field; ignoring");
            return Ok(ReconcileOutcome::Ignored);
        };

        let transaction = self
            .transactions
            .find_by_reference(&reference)
            .await?
            .ok_or_else(|| {
                ServiceError::ReconciliationError(format!(
                    "no transaction matches webhook reference '{}'",
                    reference
                ))
            })?;

        let Some(mapped) = map_psp_status(&raw_status) else {
            info!(transaction_id = %transaction.id, status = %raw_status,
                "intermediate PSP status; leaving transaction pending");
            return Ok(ReconcileOutcome::Ignored);
        };

        let current = transaction.status();
        if current == mapped {
            info!(transaction_id = %transaction.id, status = %mapped,
                "duplicate delivery; status already applied");
            return Ok(ReconcileOutcome::NoChange);
        }

        if current.is_terminal() {
            // No transition out of a terminal state through this path.
            warn!(transaction_id = %transaction.id, %current, requested = %mapped,
                "webhook requested transition out of terminal status; ignoring");
            return Ok(ReconcileOutcome::NoChange);
        }

        let applied = self
            .transactions
            .transition_from_pending(transaction.id, mapped)
            .await?;
        if !applied {
            // A concurrent delivery won the compare-and-set.
            return Ok(ReconcileOutcome::NoChange);
        }

        self.emit_transition(transaction.id, mapped).await;
        Ok(ReconcileOutcome::Applied(mapped))
    }

    async fn emit_transition(&self, transaction_id: Uuid, status: TransactionStatus) {
        let event = match status {
            TransactionStatus::Approved => Event::PaymentApproved { transaction_id },
            TransactionStatus::Rejected => Event::PaymentRejected { transaction_id },
            TransactionStatus::Refunded => Event::PaymentRefunded { transaction_id },
            TransactionStatus::Pending => return,
        };
        self.events.send(event).await;
    }
}
