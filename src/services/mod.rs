pub mod bumps;
pub mod checkout;
pub mod leads;
pub mod payments;
pub mod pricing;
pub mod products;
pub mod reconciliation;
pub mod transactions;
