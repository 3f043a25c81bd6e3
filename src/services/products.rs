use crate::entities::{product, Product};
use crate::errors::ServiceError;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

/// Read-only access to the product catalog. The checkout pipeline never
/// writes product records.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Look a product up by slug, or by id when the argument parses as one.
    pub async fn get_by_slug_or_id(&self, slug_or_id: &str) -> Result<product::Model, ServiceError> {
        if let Ok(id) = Uuid::parse_str(slug_or_id) {
            return self.get_by_id(id).await;
        }

        Product::find()
            .filter(product::Column::Slug.eq(slug_or_id))
            .filter(product::Column::Active.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product '{}' not found", slug_or_id)))
    }

    /// Snapshot of active products used to resolve order-bump references.
    pub async fn catalog(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::Active.eq(true))
            .all(&*self.db)
            .await?)
    }
}
