//! Types shared by the scoring stages

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

/// Per-product signal values. Lookups of absent products read as `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalMap {
    values: HashMap<ProductId, f64>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `id`, or `0.0` when the product has no entry.
    pub fn get(&self, id: ProductId) -> f64 {
        self.values.get(&id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn insert(&mut self, id: ProductId, value: f64) {
        self.values.insert(id, value);
    }

    /// Adds `value` to the running total for `id`.
    pub fn accumulate(&mut self, id: ProductId, value: f64) {
        *self.values.entry(id).or_insert(0.0) += value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.values().copied().reduce(f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductId, f64)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }

    /// Divides every value by the map's maximum. When the maximum is not
    /// positive every value becomes `0.0`.
    pub fn normalize_by_max(&mut self) {
        let max = self.max().unwrap_or(0.0);
        for value in self.values.values_mut() {
            *value = if max > 0.0 { *value / max } else { 0.0 };
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize_by_max();
        self
    }
}

impl FromIterator<(ProductId, f64)> for SignalMap {
    fn from_iter<I: IntoIterator<Item = (ProductId, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Main product -> (partner product -> affinity). Partners are kept ordered
/// by id so that pair lists come out the same on every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairScores {
    pairs: HashMap<ProductId, BTreeMap<ProductId, f64>>,
}

impl PairScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the larger of the current and the offered value for the pair.
    pub fn retain_max(&mut self, main: ProductId, partner: ProductId, value: f64) {
        let slot = self.pairs.entry(main).or_default().entry(partner).or_insert(value);
        if value > *slot {
            *slot = value;
        }
    }

    pub fn get(&self, main: ProductId, partner: ProductId) -> f64 {
        self.pairs.get(&main).and_then(|partners| partners.get(&partner)).copied().unwrap_or(0.0)
    }

    pub fn partners(&self, main: ProductId) -> impl Iterator<Item = (ProductId, f64)> + '_ {
        self.pairs.get(&main).into_iter().flat_map(|partners| {
            partners.iter().map(|(partner, value)| (*partner, *value))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn main_products(&self) -> usize {
        self.pairs.len()
    }

    /// Normalizes each main product's partners by that product's own maximum.
    pub fn normalize_per_main(&mut self) {
        for partners in self.pairs.values_mut() {
            let max = partners.values().copied().reduce(f64::max).unwrap_or(0.0);
            for value in partners.values_mut() {
                *value = if max > 0.0 { *value / max } else { 0.0 };
            }
        }
    }
}

/// Which sales channel the ranking should favour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    Online,
    Otc,
    #[default]
    All,
}

impl Focus {
    /// Parses a focus name, ignoring case and surrounding whitespace, so
    /// `"online"`, `"Online"` and `"ONLINE"` all select [`Focus::Online`].
    /// Unrecognized values fall back to [`Focus::All`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "otc" => Self::Otc,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Otc => "otc",
            Self::All => "all",
        }
    }
}

impl From<&str> for Focus {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Individual signal values behind a final score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Association-rule affinity (0.0 - 1.0)
    pub mba: f64,
    /// Content similarity (0.0 - 1.0)
    pub content: f64,
    /// Collaborative co-purchase similarity (0.0 - 1.0)
    pub collab: f64,
    /// Seasonality (0.0 - 1.0)
    pub season: f64,
    /// Trend (0.0 - 1.0)
    pub trend: f64,
    /// Normalized next-month forecast (0.0 - 1.0)
    pub forecast: f64,
    /// Inventory pressure (0.0 - 1.0)
    #[serde(rename = "stock_multiplier")]
    pub stock: f64,
    pub online_ratio: f64,
    pub otc_ratio: f64,
    /// Units sold across both channels
    pub total_sales: i64,
}

/// A cross-sell partner of a ranked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEntry {
    pub product_id: ProductId,
    pub name: String,
    pub score: f64,
}

/// One ranked catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: ProductId,
    pub name: String,
    pub final_score: f64,
    pub components: ComponentScores,
    pub pairs: Vec<PairEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_products_read_as_zero() {
        let map = SignalMap::new();
        assert_eq!(map.get(ProductId(42)), 0.0);
        assert!(!map.contains(ProductId(42)));
    }

    #[test]
    fn normalize_maps_maximum_to_one() {
        let mut map: SignalMap =
            [(ProductId(1), 2.0), (ProductId(2), 8.0), (ProductId(3), 0.0)].into_iter().collect();
        map.normalize_by_max();

        assert_eq!(map.get(ProductId(2)), 1.0);
        assert_eq!(map.get(ProductId(1)), 0.25);
        assert_eq!(map.get(ProductId(3)), 0.0);
    }

    #[test]
    fn normalize_all_zero_map_stays_zero() {
        let map: SignalMap = [(ProductId(1), 0.0), (ProductId(2), 0.0)].into_iter().collect();
        let map = map.normalized();
        assert_eq!(map.max(), Some(0.0));
    }

    #[test]
    fn pair_scores_keep_strongest_value_and_normalize_per_main() {
        let mut pairs = PairScores::new();
        pairs.retain_max(ProductId(1), ProductId(2), 0.02);
        pairs.retain_max(ProductId(1), ProductId(2), 0.01);
        pairs.retain_max(ProductId(1), ProductId(3), 0.05);
        pairs.retain_max(ProductId(9), ProductId(1), 0.001);
        pairs.normalize_per_main();

        assert!((pairs.get(ProductId(1), ProductId(3)) - 1.0).abs() < 1e-12);
        assert!((pairs.get(ProductId(1), ProductId(2)) - 0.4).abs() < 1e-12);
        assert!((pairs.get(ProductId(9), ProductId(1)) - 1.0).abs() < 1e-12);
        let partners: Vec<_> = pairs.partners(ProductId(1)).map(|(id, _)| id).collect();
        assert_eq!(partners, vec![ProductId(2), ProductId(3)]);
    }

    #[test]
    fn focus_parsing_defaults_to_all() {
        assert_eq!(Focus::parse("Online"), Focus::Online);
        assert_eq!(Focus::parse("OTC"), Focus::Otc);
        assert_eq!(Focus::parse(" online "), Focus::Online);
        assert_eq!(Focus::parse("otc"), Focus::Otc);
        assert_eq!(Focus::parse("all"), Focus::All);
        assert_eq!(Focus::parse("wholesale"), Focus::All);
        assert_eq!(Focus::parse(""), Focus::All);
    }
}
