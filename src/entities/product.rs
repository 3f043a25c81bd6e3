use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A sellable product with its funnel configuration. Read-only to the
/// checkout pipeline; ownership of the record lives with the catalog.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 120))]
    pub slug: String,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    pub description: Option<String>,

    /// Sale price in minor currency units
    pub price_sale: i64,

    /// Pre-discount price in minor currency units
    pub price_original: i64,

    /// Ordered list of shipping options, stored as JSON
    pub shipping_options: Json,

    /// Configured order bumps, stored as JSON
    pub order_bumps: Json,

    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// One shipping choice offered at step 2.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShippingOption {
    pub name: String,
    /// Price in minor currency units
    pub price: i64,
}

/// A configured add-on offer. `product_id` references another catalog
/// product; title/description override that product's own copy when set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderBumpConfig {
    pub product_id: Uuid,
    #[serde(default)]
    pub discount_percent: u8,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Model {
    /// Parsed shipping options. A malformed column degrades to an empty
    /// list rather than failing the render path.
    pub fn shipping_options(&self) -> Vec<ShippingOption> {
        match serde_json::from_value(self.shipping_options.clone()) {
            Ok(options) => options,
            Err(err) => {
                warn!(product_id = %self.id, %err, "malformed shipping_options column");
                Vec::new()
            }
        }
    }

    /// Parsed order-bump configuration, degrading to empty on bad data.
    pub fn order_bumps(&self) -> Vec<OrderBumpConfig> {
        match serde_json::from_value(self.order_bumps.clone()) {
            Ok(bumps) => bumps,
            Err(err) => {
                warn!(product_id = %self.id, %err, "malformed order_bumps column");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_with(shipping: serde_json::Value, bumps: serde_json::Value) -> Model {
        Model {
            id: Uuid::new_v4(),
            slug: "curso-basico".into(),
            name: "Curso Básico".into(),
            description: None,
            price_sale: 19700,
            price_original: 29700,
            shipping_options: shipping,
            order_bumps: bumps,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn parses_shipping_and_bumps() {
        let bump_ref = Uuid::new_v4();
        let model = model_with(
            json!([{"name": "Sedex", "price": 1500}]),
            json!([{"product_id": bump_ref, "discount_percent": 20}]),
        );

        let options = model.shipping_options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].price, 1500);

        let bumps = model.order_bumps();
        assert_eq!(bumps.len(), 1);
        assert_eq!(bumps[0].product_id, bump_ref);
        assert_eq!(bumps[0].discount_percent, 20);
        assert!(bumps[0].title.is_none());
    }

    #[test]
    fn malformed_columns_degrade_to_empty() {
        let model = model_with(json!({"not": "a list"}), json!(42));
        assert!(model.shipping_options().is_empty());
        assert!(model.order_bumps().is_empty());
    }
}
