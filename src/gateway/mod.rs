//! Payment gateway seam. The rest of the pipeline only sees
//! [`PaymentGateway`], so wiring in a second PSP is a new implementation of
//! `initiate` and nothing else.

pub mod pix;

use crate::entities::transaction::TransactionStatus;
use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use pix::PixGateway;

/// Buyer identity as the PSP expects it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentBuyer {
    pub name: String,
    /// Fixed-length numeric document (11 digits)
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The single line item a per-item funnel charges for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentLineItem {
    pub title: String,
    /// Minor currency units
    pub price: i64,
    pub quantity: u32,
}

/// Everything the PSP needs to create a charge.
#[derive(Clone, Debug)]
pub struct PaymentRequest {
    /// Local transaction id, passed to the PSP for webhook correlation
    pub reference: Uuid,
    /// Total in minor currency units
    pub amount: i64,
    pub description: String,
    pub buyer: PaymentBuyer,
    pub line_item: PaymentLineItem,
    pub attribution: Option<String>,
}

/// PSP acceptance of a charge: their identifier plus the payment token the
/// buyer-facing UI renders.
#[derive(Clone, Debug)]
pub struct GatewayIntent {
    pub provider_transaction_id: String,
    pub pix_code: String,
    pub status: TransactionStatus,
}

/// Capability interface for a payment service provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent with the PSP. Fails with a typed error on a
    /// missing credential, an amount below the PSP minimum, transport
    /// failure, a non-success response, or a response without a payment
    /// token. No retries happen here.
    async fn initiate(&self, request: &PaymentRequest) -> Result<GatewayIntent, ServiceError>;

    /// Tag recorded on transaction rows initiated through this gateway.
    fn name(&self) -> &str;
}

/// Validate the buyer document: exactly 11 ASCII digits, checked before any
/// network call.
pub fn validate_document(document: &str) -> Result<(), ServiceError> {
    if document.len() == 11 && document.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "buyer document must be exactly 11 digits".to_string(),
        ))
    }
}
