use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Abandonment/attribution record captured when a buyer advances past the
/// identification step. Best-effort: a failed write never blocks checkout.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    pub name: String,
    pub phone: String,
    pub email: Option<String>,

    /// Funnel step the buyer was last seen on (1, 2 or 3)
    pub step_abandoned: i16,

    /// Set once the buyer comes back and completes a payment attempt
    pub recovered: bool,

    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
