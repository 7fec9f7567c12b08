pub mod config;
pub mod domain;
pub mod errors;
pub mod recommend;

pub use config::{AppConfig, ScoringConfig};
pub use domain::product::{Product, ProductId};
pub use domain::sales::{Channel, SalesLine, StockRow};
pub use errors::{ApplicationError, DomainError};
pub use recommend::{
    ComponentScores, DataSnapshot, Focus, PairEntry, RankedResult, RecommendationEngine,
    RecommendationSource, ScoringWeights,
};
