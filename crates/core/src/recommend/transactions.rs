//! Itemset extraction from raw sales lines

use std::collections::BTreeMap;

use crate::domain::product::ProductId;
use crate::domain::sales::SalesLine;

/// Product ids bought together in one sale or order. Duplicates are kept.
pub type Itemset = Vec<ProductId>;

/// Groups sale lines by sale id and order lines by order id. Sales come
/// first, then orders, each in ascending transaction id.
pub fn extract_itemsets(sale_lines: &[SalesLine], order_lines: &[SalesLine]) -> Vec<Itemset> {
    let mut itemsets = group_by_transaction(sale_lines);
    itemsets.extend(group_by_transaction(order_lines));
    itemsets
}

fn group_by_transaction(lines: &[SalesLine]) -> Vec<Itemset> {
    let mut grouped: BTreeMap<i64, Itemset> = BTreeMap::new();
    for line in lines {
        grouped.entry(line.transaction_id).or_default().push(line.product_id);
    }
    grouped.into_values().collect()
}
