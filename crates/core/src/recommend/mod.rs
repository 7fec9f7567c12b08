//! Multi-signal product recommendation scoring
//!
//! Every catalog product is scored from seven independent signals computed
//! over one snapshot of the catalog, in-store sales, online orders and stock:
//! association-rule affinity, TF-IDF content similarity, collaborative
//! co-purchase similarity, seasonality, trend, a linear next-month forecast
//! and inventory pressure. The signals are weighted, boosted by the product's
//! channel mix and damped for products that barely sell.

pub mod association;
pub mod channel;
pub mod collaborative;
pub mod composer;
pub mod content;
pub mod engine;
pub mod inventory;
pub mod source;
pub mod temporal;
pub mod transactions;
pub mod types;

pub use association::{AssociationMiner, AssociationScores, MiningThresholds, Rule};
pub use channel::ChannelMix;
pub use collaborative::CollaborativeSimilarityScorer;
pub use composer::{ScoreComposer, ScoringWeights, SignalSet};
pub use content::ContentSimilarityScorer;
pub use engine::RecommendationEngine;
pub use inventory::InventoryFactor;
pub use source::{DataSnapshot, RecommendationSource};
pub use temporal::{TemporalAnalytics, TemporalSignals};
pub use types::*;

/// Default scoring weights
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    mba: 0.30,
    content: 0.20,
    collab: 0.20,
    season: 0.05,
    trend: 0.05,
    forecast: 0.10,
    stock: 0.05,
};

/// Boost per unit of the focused channel's sales ratio
pub const FOCUSED_CHANNEL_BOOST: f64 = 0.10;

/// Boost per unit of each channel's ratio when no channel is focused
pub const MIXED_CHANNEL_BOOST: f64 = 0.05;

/// Units sold at which the low-sales penalty stops applying
pub const HEALTHY_SALES_UNITS: i64 = 5;

/// Pair partners must sell at least this share through the focused channel
pub const PAIR_CHANNEL_MIN_RATIO: f64 = 0.5;
