//! Weighted combination of signals into the final ranking

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::association::AssociationScores;
use super::channel::ChannelMix;
use super::temporal::TemporalSignals;
use super::types::{ComponentScores, Focus, PairEntry, RankedResult, SignalMap};
use crate::domain::product::{Product, ProductId};

/// Weights for the base score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Association-rule affinity (default: 0.30)
    pub mba: f64,
    /// Content similarity (default: 0.20)
    pub content: f64,
    /// Collaborative similarity (default: 0.20)
    pub collab: f64,
    /// Seasonality (default: 0.05)
    pub season: f64,
    /// Trend (default: 0.05)
    pub trend: f64,
    /// Forecast (default: 0.10)
    pub forecast: f64,
    /// Inventory pressure (default: 0.05)
    pub stock: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    pub fn as_pairs(&self) -> [(&'static str, f64); 7] {
        [
            ("mba", self.mba),
            ("content", self.content),
            ("collab", self.collab),
            ("season", self.season),
            ("trend", self.trend),
            ("forecast", self.forecast),
            ("stock", self.stock),
        ]
    }
}

/// Every signal computed for one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    pub association: AssociationScores,
    pub content: SignalMap,
    pub collab: SignalMap,
    pub temporal: TemporalSignals,
    pub stock: SignalMap,
    pub channel: ChannelMix,
}

/// Boost for how much of a product sells through the focused channel.
pub fn channel_boost(focus: Focus, components: &ComponentScores) -> f64 {
    match focus {
        Focus::Online => components.online_ratio * super::FOCUSED_CHANNEL_BOOST,
        Focus::Otc => components.otc_ratio * super::FOCUSED_CHANNEL_BOOST,
        Focus::All => {
            components.online_ratio * super::MIXED_CHANNEL_BOOST
                + components.otc_ratio * super::MIXED_CHANNEL_BOOST
        }
    }
}

/// Penalty for products that barely sell.
pub fn sales_multiplier(total_sales: i64) -> f64 {
    if total_sales <= 0 {
        0.6
    } else if total_sales < super::HEALTHY_SALES_UNITS {
        0.85
    } else {
        1.0
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Whether a partner's channel mix passes the focus filter.
fn partner_matches_focus(focus: Focus, channel: &ChannelMix, partner: ProductId) -> bool {
    match focus {
        Focus::Online => channel.online_ratio.get(partner) >= super::PAIR_CHANNEL_MIN_RATIO,
        Focus::Otc => channel.otc_ratio.get(partner) >= super::PAIR_CHANNEL_MIN_RATIO,
        Focus::All => true,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoreComposer {
    weights: ScoringWeights,
}

impl ScoreComposer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn components(&self, signals: &SignalSet, id: ProductId) -> ComponentScores {
        ComponentScores {
            mba: signals.association.affinity.get(id),
            content: signals.content.get(id),
            collab: signals.collab.get(id),
            season: signals.temporal.season.get(id),
            trend: signals.temporal.trend.get(id),
            forecast: signals.temporal.forecast.get(id),
            stock: signals.stock.get(id),
            online_ratio: signals.channel.online_ratio.get(id),
            otc_ratio: signals.channel.otc_ratio.get(id),
            total_sales: signals.channel.total_sales(id),
        }
    }

    pub fn base_score(&self, components: &ComponentScores) -> f64 {
        components.mba * self.weights.mba
            + components.content * self.weights.content
            + components.collab * self.weights.collab
            + components.season * self.weights.season
            + components.trend * self.weights.trend
            + components.forecast * self.weights.forecast
            + components.stock * self.weights.stock
    }

    /// Final score rounded to four decimals.
    pub fn final_score(&self, focus: Focus, components: &ComponentScores) -> f64 {
        let boosted = self.base_score(components) + channel_boost(focus, components);
        round4(boosted * sales_multiplier(components.total_sales))
    }

    /// One result per catalog product, stable-sorted by descending final
    /// score so ties keep catalog order.
    pub fn compose(
        &self,
        products: &[Product],
        signals: &SignalSet,
        focus: Focus,
    ) -> Vec<RankedResult> {
        let names: HashMap<ProductId, &str> =
            products.iter().map(|product| (product.id, product.name.as_str())).collect();

        let mut results: Vec<RankedResult> = products
            .iter()
            .map(|product| {
                let components = self.components(signals, product.id);
                let pairs = signals
                    .association
                    .pairs
                    .partners(product.id)
                    .filter(|(partner, _)| partner_matches_focus(focus, &signals.channel, *partner))
                    .filter_map(|(partner, score)| {
                        names.get(&partner).map(|name| PairEntry {
                            product_id: partner,
                            name: (*name).to_owned(),
                            score,
                        })
                    })
                    .collect();

                RankedResult {
                    id: product.id,
                    name: product.name.clone(),
                    final_score: self.final_score(focus, &components),
                    components,
                    pairs,
                }
            })
            .collect();

        results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        results
    }
}
