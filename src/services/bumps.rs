//! Order-bump resolution: joins configured add-on references against a
//! catalog snapshot into render-ready projections.

use crate::entities::product::{self, OrderBumpConfig};
use crate::services::pricing::discounted_price;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// A purchasable add-on as offered on the checkout page. Derived per render
/// from the live catalog; never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BumpProjection {
    /// Resolved add-on product id
    pub product_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Catalog price in minor currency units
    pub price: i64,
    pub discount_percent: u8,
    /// Price after discount, rounded half-up per line
    pub discounted_price: i64,
}

/// Resolve configured bumps against a catalog snapshot.
///
/// Prices always come from the catalog, never from the bump config, so a
/// repriced add-on is offered at its current price. References that cannot
/// be resolved (deleted or deactivated products) are dropped: the bump
/// simply stops being offered.
pub fn resolve_bumps(configured: &[OrderBumpConfig], catalog: &[product::Model]) -> Vec<BumpProjection> {
    configured
        .iter()
        .filter_map(|bump| {
            let Some(referenced) = catalog.iter().find(|p| p.id == bump.product_id && p.active)
            else {
                debug!(product_id = %bump.product_id, "dropping unresolvable order bump");
                return None;
            };

            let discount = bump.discount_percent.min(100);
            Some(BumpProjection {
                product_id: referenced.id,
                title: bump
                    .title
                    .clone()
                    .unwrap_or_else(|| referenced.name.clone()),
                description: bump.description.clone(),
                price: referenced.price_sale,
                discount_percent: discount,
                discounted_price: discounted_price(referenced.price_sale, discount),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn catalog_product(name: &str, price: i64, active: bool) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            slug: name.to_lowercase(),
            name: name.into(),
            description: None,
            price_sale: price,
            price_original: price,
            shipping_options: json!([]),
            order_bumps: json!([]),
            active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn bump(product_id: Uuid, discount: u8, title: Option<&str>) -> OrderBumpConfig {
        OrderBumpConfig {
            product_id,
            discount_percent: discount,
            title: title.map(Into::into),
            description: None,
        }
    }

    #[test]
    fn resolves_against_catalog_price_with_name_fallback() {
        let addon = catalog_product("Ebook Extra", 5000, true);
        let projections = resolve_bumps(&[bump(addon.id, 20, None)], &[addon.clone()]);

        assert_eq!(projections.len(), 1);
        let p = &projections[0];
        assert_eq!(p.title, "Ebook Extra");
        assert_eq!(p.price, 5000);
        assert_eq!(p.discounted_price, 4000);
    }

    #[test]
    fn custom_title_overrides_product_name() {
        let addon = catalog_product("Ebook Extra", 5000, true);
        let projections =
            resolve_bumps(&[bump(addon.id, 0, Some("Leve junto!"))], &[addon]);
        assert_eq!(projections[0].title, "Leve junto!");
    }

    #[test]
    fn missing_reference_is_omitted_not_an_error() {
        let addon = catalog_product("Ebook Extra", 5000, true);
        let projections = resolve_bumps(
            &[bump(Uuid::new_v4(), 20, None), bump(addon.id, 10, None)],
            &[addon],
        );
        assert_eq!(projections.len(), 1);
        assert_eq!(projections[0].discount_percent, 10);
    }

    #[test]
    fn inactive_products_are_not_offered() {
        let addon = catalog_product("Desativado", 5000, false);
        let projections = resolve_bumps(&[bump(addon.id, 20, None)], &[addon]);
        assert!(projections.is_empty());
    }

    #[test]
    fn discount_is_clamped_to_hundred() {
        let addon = catalog_product("Ebook", 1000, true);
        let projections = resolve_bumps(&[bump(addon.id, 255, None)], &[addon]);
        assert_eq!(projections[0].discount_percent, 100);
        assert_eq!(projections[0].discounted_price, 0);
    }
}
