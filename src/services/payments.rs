//! Settlement pipeline orchestration: validate, persist the pending intent,
//! call the PSP, and settle the row into its post-call shape.

use crate::entities::transaction::TransactionStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{validate_document, PaymentGateway, PaymentRequest};
use crate::services::leads::LeadService;
use crate::services::transactions::{NewTransaction, TransactionService};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Everything needed to run one payment attempt.
#[derive(Clone, Debug)]
pub struct InitiatePayment {
    pub product_id: Uuid,
    pub product_title: String,
    /// Total in minor currency units, as computed by the pricing engine
    pub amount: i64,
    pub description: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub document: String,
    pub payment_method: String,
    pub attribution: Option<String>,
    /// Checkout session id; doubles as the idempotency key
    pub session_id: Option<Uuid>,
    /// Lead to flag as recovered on success
    pub lead_id: Option<Uuid>,
}

/// What the buyer-facing UI needs to render the payment screen.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PaymentOutcome {
    pub transaction_id: Uuid,
    pub pix_code: String,
    pub status: TransactionStatus,
}

pub struct PaymentService {
    transactions: Arc<TransactionService>,
    leads: Arc<LeadService>,
    gateway: Arc<dyn PaymentGateway>,
    events: EventSender,
}

impl PaymentService {
    pub fn new(
        transactions: Arc<TransactionService>,
        leads: Arc<LeadService>,
        gateway: Arc<dyn PaymentGateway>,
        events: EventSender,
    ) -> Self {
        Self {
            transactions,
            leads,
            gateway,
            events,
        }
    }

    /// Run the settlement pipeline for one payment attempt.
    ///
    /// The local row is written `pending` before the PSP call, so every
    /// attempt is auditable even if the outbound call never completes. A
    /// definitive gateway failure marks the row `rejected`; it is never
    /// left `pending` after a known failure.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, amount = input.amount))]
    pub async fn initiate(&self, input: InitiatePayment) -> Result<PaymentOutcome, ServiceError> {
        validate_document(&input.document)?;

        // Double submit from the same session reuses the open intent
        // instead of creating another row.
        if let Some(session_id) = input.session_id {
            if let Some(existing) = self
                .transactions
                .find_pending_by_session(session_id)
                .await?
            {
                if let Some(pix_code) = existing.pix_code.clone() {
                    warn!(session_id = %session_id, transaction_id = %existing.id,
                        "reusing open payment intent for session");
                    return Ok(PaymentOutcome {
                        transaction_id: existing.id,
                        pix_code,
                        status: existing.status(),
                    });
                }
            }
        }

        // An unaudited payment must never be initiated: a failed insert
        // aborts the attempt before any network call.
        let row = self
            .transactions
            .insert_pending(NewTransaction {
                product_id: input.product_id,
                customer_name: input.customer_name.clone(),
                customer_phone: input.customer_phone.clone(),
                customer_email: input.customer_email.clone(),
                amount: input.amount,
                payment_method: input.payment_method.clone(),
                gateway: self.gateway.name().to_string(),
                session_id: input.session_id,
            })
            .await?;

        let request = PaymentRequest {
            reference: row.id,
            amount: input.amount,
            description: input.description.clone(),
            buyer: crate::gateway::PaymentBuyer {
                name: input.customer_name.clone(),
                document: input.document.clone(),
                email: input.customer_email.clone(),
                phone: Some(input.customer_phone.clone()),
            },
            line_item: crate::gateway::PaymentLineItem {
                title: input.product_title.clone(),
                price: input.amount,
                quantity: 1,
            },
            attribution: input.attribution.clone(),
        };

        let intent = match self.gateway.initiate(&request).await {
            Ok(intent) => intent,
            Err(err) => {
                // Definitive failure: settle the row as rejected before
                // surfacing the typed error.
                if let Err(update_err) = self
                    .transactions
                    .transition_from_pending(row.id, TransactionStatus::Rejected)
                    .await
                {
                    error!(transaction_id = %row.id, %update_err,
                        "failed to mark transaction rejected after gateway failure");
                }
                self.events
                    .send(Event::PaymentRejected {
                        transaction_id: row.id,
                    })
                    .await;
                return Err(err);
            }
        };

        let row = self
            .transactions
            .record_intent(row.id, &intent.pix_code, &intent.provider_transaction_id)
            .await?;

        if let Some(lead_id) = input.lead_id {
            if let Err(err) = self.leads.mark_recovered(lead_id).await {
                warn!(%lead_id, %err, "failed to mark lead recovered");
            }
        }

        self.events
            .send(Event::PaymentInitiated {
                transaction_id: row.id,
                amount: row.amount,
            })
            .await;

        Ok(PaymentOutcome {
            transaction_id: row.id,
            pix_code: intent.pix_code,
            status: TransactionStatus::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Transaction;
    use crate::gateway::{GatewayIntent, MockPaymentGateway};
    use assert_matches::assert_matches;
    use sea_orm::{Database, DatabaseConnection, EntityTrait};
    use sea_orm_migration::MigratorTrait;
    use tokio::sync::mpsc;

    async fn test_db() -> Arc<DatabaseConnection> {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        crate::migrator::Migrator::up(&db, None)
            .await
            .expect("migrations");
        Arc::new(db)
    }

    fn service(db: Arc<DatabaseConnection>, gateway: MockPaymentGateway) -> PaymentService {
        let (tx, _rx) = mpsc::channel(16);
        let transactions = Arc::new(TransactionService::new(db.clone()));
        let leads = Arc::new(LeadService::new(db));
        PaymentService::new(transactions, leads, Arc::new(gateway), EventSender::new(tx))
    }

    fn input(document: &str) -> InitiatePayment {
        InitiatePayment {
            product_id: Uuid::new_v4(),
            product_title: "Curso Básico".into(),
            amount: 19700,
            description: "Curso Básico".into(),
            customer_name: "Maria".into(),
            customer_phone: "11999990000".into(),
            customer_email: None,
            document: document.into(),
            payment_method: "pix".into(),
            attribution: None,
            session_id: None,
            lead_id: None,
        }
    }

    #[tokio::test]
    async fn acceptance_leaves_the_row_pending_with_the_token() {
        let db = test_db().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_name().return_const("pix".to_string());
        gateway.expect_initiate().times(1).returning(|_| {
            Ok(GatewayIntent {
                provider_transaction_id: "T9".into(),
                pix_code: "00020126pix".into(),
                status: TransactionStatus::Pending,
            })
        });

        let outcome = service(db.clone(), gateway)
            .initiate(input("12345678901"))
            .await
            .unwrap();
        assert_eq!(outcome.status, TransactionStatus::Pending);
        assert_eq!(outcome.pix_code, "00020126pix");

        let rows = Transaction::find().all(&*db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "pending");
        assert_eq!(rows[0].pix_code.as_deref(), Some("00020126pix"));
        assert_eq!(rows[0].gateway_transaction_id.as_deref(), Some("T9"));
    }

    #[tokio::test]
    async fn gateway_failure_settles_the_row_rejected() {
        let db = test_db().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_name().return_const("pix".to_string());
        gateway
            .expect_initiate()
            .times(1)
            .returning(|_| Err(ServiceError::GatewayError("PSP unreachable".into())));

        let err = service(db.clone(), gateway)
            .initiate(input("12345678901"))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::GatewayError(_));

        let rows = Transaction::find().all(&*db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "rejected");
    }

    #[tokio::test]
    async fn invalid_document_never_touches_gateway_or_ledger() {
        let db = test_db().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_name().return_const("pix".to_string());
        gateway.expect_initiate().never();

        let err = service(db.clone(), gateway)
            .initiate(input("123"))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));

        let rows = Transaction::find().all(&*db).await.unwrap();
        assert!(rows.is_empty());
    }
}
