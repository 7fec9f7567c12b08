use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

/// Sales channel a quantity was sold through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Over-the-counter, in-store sale.
    Otc,
    Online,
}

/// One line of a sale (OTC) or an order (online). Sale ids and order ids are
/// independent id spaces; `channel` says which one `transaction_id` belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesLine {
    pub channel: Channel,
    pub transaction_id: i64,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: NaiveDateTime,
}

impl SalesLine {
    pub fn otc(
        sale_id: i64,
        product_id: i64,
        quantity: i64,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            channel: Channel::Otc,
            transaction_id: sale_id,
            product_id: ProductId(product_id),
            quantity,
            occurred_at,
        }
    }

    pub fn online(
        order_id: i64,
        product_id: i64,
        quantity: i64,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            channel: Channel::Online,
            transaction_id: order_id,
            product_id: ProductId(product_id),
            quantity,
            occurred_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl StockRow {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id: ProductId(product_id), quantity }
    }
}
