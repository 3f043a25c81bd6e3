//! Offer pricing. Pure integer arithmetic over minor currency units; no
//! I/O, safe to recompute on every selection change.

use crate::entities::product;
use crate::services::bumps::BumpProjection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Buyer selections for one checkout session.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SelectionState {
    /// Index into the product's shipping option list
    pub shipping_index: usize,
    /// Toggled order bumps; presence means selected
    pub selected_bump_ids: HashSet<Uuid>,
}

impl SelectionState {
    /// Toggle a bump selection. Returns whether the bump is selected after
    /// the call.
    pub fn toggle_bump(&mut self, bump_id: Uuid) -> bool {
        if !self.selected_bump_ids.remove(&bump_id) {
            self.selected_bump_ids.insert(bump_id);
            true
        } else {
            false
        }
    }
}

/// Totals for a `(product, selection)` pair. All amounts in minor currency
/// units; `total` is always exactly `subtotal + shipping + bumps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TotalsBreakdown {
    pub subtotal: i64,
    pub shipping: i64,
    pub bumps: i64,
    pub total: i64,
}

/// Apply a percentage discount to a minor-unit price, rounding half-up.
/// Discounts outside [0, 100] are clamped.
pub fn discounted_price(price: i64, discount_percent: u8) -> i64 {
    let pct = i64::from(discount_percent.min(100));
    let price = price.max(0);
    (price * (100 - pct) + 50) / 100
}

/// Compute the totals breakdown for a product with the given selections.
///
/// An out-of-range shipping index prices shipping at zero; the engine sits
/// on the render path and must not fail shut.
pub fn compute_totals(
    product: &product::Model,
    selection: &SelectionState,
    bump_projections: &[BumpProjection],
) -> TotalsBreakdown {
    let subtotal = product.price_sale.max(0);

    let options = product.shipping_options();
    let shipping = options
        .get(selection.shipping_index)
        .map(|o| o.price.max(0))
        .unwrap_or(0);

    let bumps = bump_projections
        .iter()
        .filter(|p| selection.selected_bump_ids.contains(&p.product_id))
        .map(|p| p.discounted_price)
        .sum::<i64>();

    TotalsBreakdown {
        subtotal,
        shipping,
        bumps,
        total: subtotal + shipping + bumps,
    }
}
