use crate::entities::{lead, Lead};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Input for a lead capture write.
#[derive(Clone, Debug)]
pub struct CaptureLead {
    pub product_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub step_abandoned: i16,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

/// Writes abandonment/attribution records. Callers treat failures as
/// non-fatal; capture is a recovery signal, not a checkout precondition.
#[derive(Clone)]
pub struct LeadService {
    db: Arc<DatabaseConnection>,
}

impl LeadService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn capture(&self, input: CaptureLead) -> Result<lead::Model, ServiceError> {
        let model = lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            name: Set(input.name),
            phone: Set(input.phone),
            email: Set(input.email),
            step_abandoned: Set(input.step_abandoned),
            recovered: Set(false),
            utm_source: Set(input.utm_source),
            utm_medium: Set(input.utm_medium),
            utm_campaign: Set(input.utm_campaign),
            created_at: Set(Utc::now()),
        };

        Ok(model.insert(&*self.db).await?)
    }

    /// Flag a captured lead as recovered once its buyer completes a payment
    /// attempt.
    #[instrument(skip(self))]
    pub async fn mark_recovered(&self, lead_id: Uuid) -> Result<(), ServiceError> {
        let Some(existing) = Lead::find_by_id(lead_id).one(&*self.db).await? else {
            return Err(ServiceError::NotFound(format!("Lead {} not found", lead_id)));
        };

        let mut active: lead::ActiveModel = existing.into();
        active.recovered = Set(true);
        active.update(&*self.db).await?;
        Ok(())
    }
}
