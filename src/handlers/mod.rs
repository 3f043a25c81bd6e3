pub mod checkout;
pub mod webhooks;

use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::services::{
    checkout::CheckoutService, leads::LeadService, payments::PaymentService,
    products::ProductService, reconciliation::ReconciliationService,
    transactions::TransactionService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Service aggregate shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub checkout: Arc<CheckoutService>,
    pub payments: Arc<PaymentService>,
    pub transactions: Arc<TransactionService>,
    pub leads: Arc<LeadService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let products = Arc::new(ProductService::new(db.clone()));
        let leads = Arc::new(LeadService::new(db.clone()));
        let transactions = Arc::new(TransactionService::new(db));
        let checkout = Arc::new(CheckoutService::new(leads.clone(), event_sender.clone()));
        let payments = Arc::new(PaymentService::new(
            transactions.clone(),
            leads.clone(),
            gateway,
            event_sender.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationService::new(
            transactions.clone(),
            event_sender,
        ));

        Self {
            products,
            checkout,
            payments,
            transactions,
            leads,
            reconciliation,
        }
    }
}
