//! Online / OTC quantity mix per product

use std::collections::HashMap;

use super::types::SignalMap;
use crate::domain::product::{Product, ProductId};
use crate::domain::sales::{Channel, SalesLine};

/// Channel ratios and unit totals per catalog product. Products without
/// sales carry explicit zeros.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMix {
    pub online_ratio: SignalMap,
    pub otc_ratio: SignalMap,
    pub total_sales: HashMap<ProductId, i64>,
}

impl ChannelMix {
    pub fn compute<'a>(
        products: &[Product],
        lines: impl IntoIterator<Item = &'a SalesLine>,
    ) -> Self {
        let mut quantities: HashMap<ProductId, (i64, i64)> = HashMap::new();
        for line in lines {
            let (otc, online) = quantities.entry(line.product_id).or_insert((0, 0));
            match line.channel {
                Channel::Otc => *otc += line.quantity,
                Channel::Online => *online += line.quantity,
            }
        }

        let mut mix = Self::default();
        for product in products {
            let (otc, online) = quantities.get(&product.id).copied().unwrap_or((0, 0));
            let total = otc + online;

            let (online_ratio, otc_ratio, total_sales) = if total <= 0 {
                (0.0, 0.0, 0)
            } else {
                let total_f = total as f64;
                (
                    (online as f64 / total_f).clamp(0.0, 1.0),
                    (otc as f64 / total_f).clamp(0.0, 1.0),
                    total,
                )
            };

            mix.online_ratio.insert(product.id, online_ratio);
            mix.otc_ratio.insert(product.id, otc_ratio);
            mix.total_sales.insert(product.id, total_sales);
        }

        mix
    }

    pub fn total_sales(&self, id: ProductId) -> i64 {
        self.total_sales.get(&id).copied().unwrap_or(0)
    }
}
