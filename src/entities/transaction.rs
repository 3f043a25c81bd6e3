use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a payment intent. Created `Pending`; moved to a terminal
/// state exactly once.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Authoritative record of a payment intent. Written before the PSP call so
/// every attempt is auditable; mutated only by the settlement reconciler and
/// the adapter's rejected-on-failure path; never deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,

    /// Amount in minor currency units
    pub amount: i64,

    /// One of "pending", "approved", "rejected", "refunded"
    pub status: String,

    pub payment_method: String,

    /// Tag of the gateway implementation that initiated the intent
    pub gateway: String,

    /// PSP-issued payment token; null until the intent is accepted
    pub pix_code: Option<String>,

    /// PSP-side identifier, used to match inbound webhooks
    pub gateway_transaction_id: Option<String>,

    /// Checkout session that produced this intent (idempotency key)
    pub session_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Typed view of the stored status. Unknown strings read as `Pending`,
    /// the non-terminal state, so a bad row can still be reconciled.
    pub fn status(&self) -> TransactionStatus {
        self.status
            .parse()
            .unwrap_or(TransactionStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_as_lowercase() {
        assert_eq!(TransactionStatus::Pending.to_string(), "pending");
        assert_eq!(TransactionStatus::Approved.to_string(), "approved");
        assert_eq!(
            "rejected".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Rejected
        );
        assert_eq!(
            "refunded".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Refunded
        );
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Approved.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
    }
}
