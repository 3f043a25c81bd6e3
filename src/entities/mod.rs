pub mod lead;
pub mod product;
pub mod transaction;

pub use lead::Entity as Lead;
pub use product::Entity as Product;
pub use transaction::Entity as Transaction;
