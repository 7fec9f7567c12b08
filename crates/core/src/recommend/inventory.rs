//! Stock-to-threshold urgency

use std::collections::HashMap;

use super::types::SignalMap;
use crate::domain::product::{Product, ProductId};
use crate::domain::sales::StockRow;

/// Score used when a product has stock but no usable low-stock threshold.
pub const MISSING_THRESHOLD_SCORE: f64 = 0.3;

/// Maps stock on hand relative to the low-stock threshold to a step score:
/// the closer to the threshold, the higher the urgency.
pub fn stock_factor(quantity: i64, threshold: Option<i64>) -> f64 {
    if quantity <= 0 {
        return 0.0;
    }

    let threshold = match threshold {
        Some(threshold) if threshold > 0 => threshold,
        _ => return MISSING_THRESHOLD_SCORE,
    };

    let ratio = quantity as f64 / threshold as f64;
    if ratio <= 1.0 {
        1.0
    } else if ratio <= 2.0 {
        0.7
    } else if ratio <= 3.0 {
        0.4
    } else {
        0.2
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryFactor;

impl InventoryFactor {
    /// One entry per catalog product; stock rows are summed per product.
    pub fn score(&self, products: &[Product], stock: &[StockRow]) -> SignalMap {
        let mut on_hand: HashMap<ProductId, i64> = HashMap::new();
        for row in stock {
            *on_hand.entry(row.product_id).or_insert(0) += row.quantity;
        }

        products
            .iter()
            .map(|product| {
                let quantity = on_hand.get(&product.id).copied().unwrap_or(0);
                (product.id, stock_factor(quantity, product.low_stock_threshold))
            })
            .collect()
    }
}
