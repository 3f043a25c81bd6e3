use crate::entities::{
    transaction::{self, TransactionStatus},
    Transaction,
};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Input for creating the local pending row ahead of the PSP call.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub product_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub amount: i64,
    pub payment_method: String,
    pub gateway: String,
    pub session_id: Option<Uuid>,
}

/// The transaction ledger. Rows are inserted `pending` before any network
/// call and only ever move forward; nothing here deletes.
#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DatabaseConnection>,
}

impl TransactionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id, amount = input.amount))]
    pub async fn insert_pending(
        &self,
        input: NewTransaction,
    ) -> Result<transaction::Model, ServiceError> {
        let model = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            customer_name: Set(input.customer_name),
            customer_phone: Set(input.customer_phone),
            customer_email: Set(input.customer_email),
            amount: Set(input.amount),
            status: Set(TransactionStatus::Pending.to_string()),
            payment_method: Set(input.payment_method),
            gateway: Set(input.gateway),
            pix_code: Set(None),
            gateway_transaction_id: Set(None),
            session_id: Set(input.session_id),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        Ok(model.insert(&*self.db).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<transaction::Model>, ServiceError> {
        Ok(Transaction::find_by_id(id).one(&*self.db).await?)
    }

    /// Match an inbound webhook identifier to a local row: the local id
    /// when it parses as a UUID, otherwise the PSP-side identifier.
    pub async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<transaction::Model>, ServiceError> {
        if let Ok(id) = Uuid::parse_str(reference) {
            if let Some(found) = self.find_by_id(id).await? {
                return Ok(Some(found));
            }
        }

        Ok(Transaction::find()
            .filter(transaction::Column::GatewayTransactionId.eq(reference))
            .one(&*self.db)
            .await?)
    }

    /// The still-open intent for a checkout session, if any. Used to make
    /// payment initiation idempotent across double submits.
    pub async fn find_pending_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<transaction::Model>, ServiceError> {
        Ok(Transaction::find()
            .filter(transaction::Column::SessionId.eq(session_id))
            .filter(transaction::Column::Status.eq(TransactionStatus::Pending.to_string()))
            .one(&*self.db)
            .await?)
    }

    /// Record the PSP acceptance: payment token plus PSP-side identifier.
    /// Status stays `pending` until the webhook confirms funds movement.
    #[instrument(skip(self, pix_code))]
    pub async fn record_intent(
        &self,
        id: Uuid,
        pix_code: &str,
        gateway_transaction_id: &str,
    ) -> Result<transaction::Model, ServiceError> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Err(ServiceError::NotFound(format!(
                "Transaction {} not found",
                id
            )));
        };

        let mut active: transaction::ActiveModel = existing.into();
        active.pix_code = Set(Some(pix_code.to_string()));
        active.gateway_transaction_id = Set(Some(gateway_transaction_id.to_string()));
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    /// Compare-and-set status transition out of `pending`. Returns whether
    /// a row was actually moved, so near-simultaneous webhook deliveries
    /// cannot race to an inconsistent final status.
    #[instrument(skip(self))]
    pub async fn transition_from_pending(
        &self,
        id: Uuid,
        new_status: TransactionStatus,
    ) -> Result<bool, ServiceError> {
        let result = Transaction::update_many()
            .col_expr(
                transaction::Column::Status,
                Expr::value(new_status.to_string()),
            )
            .col_expr(transaction::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(transaction::Column::Id.eq(id))
            .filter(transaction::Column::Status.eq(TransactionStatus::Pending.to_string()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
