//! Whole-catalog scoring: one snapshot, six signal stages, one ranking

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::association::{AssociationMiner, MiningThresholds};
use super::channel::ChannelMix;
use super::collaborative::CollaborativeSimilarityScorer;
use super::composer::{ScoreComposer, SignalSet};
use super::content::ContentSimilarityScorer;
use super::inventory::InventoryFactor;
use super::source::{DataSnapshot, RecommendationSource};
use super::temporal::TemporalAnalytics;
use super::transactions::extract_itemsets;
use super::types::{Focus, RankedResult};
use crate::config::ScoringConfig;
use crate::errors::{ApplicationError, DomainError};

/// Runs `work` and logs how long the stage took.
fn timed<T>(stage: &'static str, work: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let output = work();
    debug!(
        event_name = "recommend.stage.completed",
        stage,
        duration_ms = started.elapsed().as_millis() as u64,
        "signal stage completed"
    );
    output
}

async fn join_stage<T>(stage: &'static str, handle: JoinHandle<T>) -> Result<T, ApplicationError> {
    handle
        .await
        .map_err(|error| ApplicationError::Internal(format!("{stage} stage failed: {error}")))
}

/// Scores and ranks the whole catalog from one data snapshot.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    miner: AssociationMiner,
    collaborative: CollaborativeSimilarityScorer,
    temporal: TemporalAnalytics,
    composer: ScoreComposer,
}

impl RecommendationEngine {
    pub fn new(config: &ScoringConfig) -> Result<Self, DomainError> {
        config.validate()?;

        Ok(Self {
            miner: AssociationMiner::new(MiningThresholds {
                min_support: config.min_support,
                min_confidence: config.min_confidence,
            }),
            collaborative: CollaborativeSimilarityScorer::new(config.collaborative_top_k),
            temporal: TemporalAnalytics::new(config.trend_window),
            composer: ScoreComposer::new(config.weights),
        })
    }

    /// Ranks every catalog product against the current local month.
    pub async fn compute_all<S>(
        &self,
        source: &S,
        focus: Focus,
    ) -> Result<Vec<RankedResult>, ApplicationError>
    where
        S: RecommendationSource + ?Sized,
    {
        self.compute_all_at(source, focus, Local::now().naive_local()).await
    }

    /// Ranks every catalog product with `as_of` fixing the current month.
    ///
    /// The signal stages run as parallel blocking tasks over one shared
    /// snapshot. Source failures are returned unchanged; a stage that
    /// panics surfaces as [`ApplicationError::Internal`].
    pub async fn compute_all_at<S>(
        &self,
        source: &S,
        focus: Focus,
        as_of: NaiveDateTime,
    ) -> Result<Vec<RankedResult>, ApplicationError>
    where
        S: RecommendationSource + ?Sized,
    {
        let started = Instant::now();
        let snapshot = Arc::new(DataSnapshot::load(source).await?);
        info!(
            event_name = "recommend.snapshot.loaded",
            products = snapshot.products.len(),
            sale_lines = snapshot.sale_lines.len(),
            order_lines = snapshot.order_lines.len(),
            stock_rows = snapshot.stock.len(),
            "recommendation snapshot loaded"
        );

        let signals = self.compute_signals_parallel(Arc::clone(&snapshot), as_of).await?;
        let results = self.composer.compose(&snapshot.products, &signals, focus);

        info!(
            event_name = "recommend.compute.completed",
            focus = focus.as_str(),
            results = results.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "recommendations computed"
        );
        Ok(results)
    }

    /// Synchronous scoring of an already loaded snapshot. Produces the same
    /// ranking as [`Self::compute_all_at`] for the same data.
    pub fn score_snapshot(
        &self,
        snapshot: &DataSnapshot,
        focus: Focus,
        as_of: NaiveDateTime,
    ) -> Vec<RankedResult> {
        let signals = self.compute_signals(snapshot, as_of);
        self.composer.compose(&snapshot.products, &signals, focus)
    }

    pub fn compute_signals(&self, snapshot: &DataSnapshot, as_of: NaiveDateTime) -> SignalSet {
        let itemsets = timed("transactions", || {
            extract_itemsets(&snapshot.sale_lines, &snapshot.order_lines)
        });

        SignalSet {
            association: timed("association", || self.miner.score(&itemsets)),
            content: timed("content", || ContentSimilarityScorer.score(&snapshot.products)),
            collab: timed("collaborative", || {
                self.collaborative.score(&snapshot.products, &itemsets)
            }),
            temporal: timed("temporal", || self.temporal.score(snapshot.all_lines(), as_of)),
            stock: timed("inventory", || InventoryFactor.score(&snapshot.products, &snapshot.stock)),
            channel: timed("channel", || {
                ChannelMix::compute(&snapshot.products, snapshot.all_lines())
            }),
        }
    }

    async fn compute_signals_parallel(
        &self,
        snapshot: Arc<DataSnapshot>,
        as_of: NaiveDateTime,
    ) -> Result<SignalSet, ApplicationError> {
        let itemsets = Arc::new(timed("transactions", || {
            extract_itemsets(&snapshot.sale_lines, &snapshot.order_lines)
        }));

        let association = {
            let (miner, itemsets) = (self.miner.clone(), Arc::clone(&itemsets));
            tokio::task::spawn_blocking(move || timed("association", || miner.score(&itemsets)))
        };
        let content = {
            let snapshot = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || {
                timed("content", || ContentSimilarityScorer.score(&snapshot.products))
            })
        };
        let collab = {
            let (scorer, snapshot, itemsets) =
                (self.collaborative, Arc::clone(&snapshot), Arc::clone(&itemsets));
            tokio::task::spawn_blocking(move || {
                timed("collaborative", || scorer.score(&snapshot.products, &itemsets))
            })
        };
        let temporal = {
            let (analytics, snapshot) = (self.temporal, Arc::clone(&snapshot));
            tokio::task::spawn_blocking(move || {
                timed("temporal", || analytics.score(snapshot.all_lines(), as_of))
            })
        };
        let stock = {
            let snapshot = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || {
                timed("inventory", || InventoryFactor.score(&snapshot.products, &snapshot.stock))
            })
        };
        let channel = {
            let snapshot = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || {
                timed("channel", || ChannelMix::compute(&snapshot.products, snapshot.all_lines()))
            })
        };

        let (association, content, collab, temporal, stock, channel) = tokio::try_join!(
            join_stage("association", association),
            join_stage("content", content),
            join_stage("collaborative", collab),
            join_stage("temporal", temporal),
            join_stage("inventory", stock),
            join_stage("channel", channel),
        )?;

        Ok(SignalSet { association, content, collab, temporal, stock, channel })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::product::{Product, ProductId};
    use crate::domain::sales::{SalesLine, StockRow};
    use crate::recommend::composer::ScoringWeights;

    struct StaticSource(DataSnapshot);

    #[async_trait]
    impl RecommendationSource for StaticSource {
        async fn catalog(&self) -> Result<Vec<Product>, ApplicationError> {
            Ok(self.0.products.clone())
        }

        async fn sale_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
            Ok(self.0.sale_lines.clone())
        }

        async fn order_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
            Ok(self.0.order_lines.clone())
        }

        async fn stock_rows(&self) -> Result<Vec<StockRow>, ApplicationError> {
            Ok(self.0.stock.clone())
        }
    }

    struct UnreachableSource;

    #[async_trait]
    impl RecommendationSource for UnreachableSource {
        async fn catalog(&self) -> Result<Vec<Product>, ApplicationError> {
            Ok(vec![Product::new(1, "Bond paper")])
        }

        async fn sale_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
            Err(ApplicationError::Persistence("connection refused".to_string()))
        }

        async fn order_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
            Ok(Vec::new())
        }

        async fn stock_rows(&self) -> Result<Vec<StockRow>, ApplicationError> {
            Ok(Vec::new())
        }
    }

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(10, 30, 0))
            .expect("valid timestamp")
    }

    fn snapshot() -> DataSnapshot {
        DataSnapshot {
            products: vec![
                Product::new(1, "Bond paper")
                    .with_description("A4 white bond paper ream")
                    .with_low_stock_threshold(10),
                Product::new(2, "Ballpen").with_description("black ink ballpen"),
                Product::new(3, "Photo paper")
                    .with_description("A4 glossy photo paper")
                    .with_low_stock_threshold(5),
                Product::new(4, "Stapler").with_description("heavy duty metal stapler"),
                Product::new(5, "Folder").with_description("long brown folder"),
            ],
            sale_lines: vec![
                SalesLine::otc(1, 1, 3, at(2025, 1, 4)),
                SalesLine::otc(1, 2, 2, at(2025, 1, 4)),
                SalesLine::otc(2, 1, 1, at(2025, 2, 9)),
                SalesLine::otc(2, 2, 1, at(2025, 2, 9)),
                SalesLine::otc(3, 4, 1, at(2025, 3, 2)),
                SalesLine::otc(4, 1, 2, at(2025, 3, 14)),
                SalesLine::otc(4, 3, 1, at(2025, 3, 14)),
            ],
            order_lines: vec![
                SalesLine::online(1, 3, 4, at(2025, 2, 20)),
                SalesLine::online(1, 1, 1, at(2025, 2, 20)),
                SalesLine::online(2, 3, 2, at(2025, 3, 1)),
                SalesLine::online(3, 2, 6, at(2025, 3, 10)),
            ],
            stock: vec![StockRow::new(1, 12), StockRow::new(3, 40), StockRow::new(4, 0)],
        }
    }

    fn engine() -> RecommendationEngine {
        RecommendationEngine::new(&ScoringConfig::default()).expect("default scoring config")
    }

    #[test]
    fn rejects_invalid_scoring_config() {
        let config = ScoringConfig { min_support: 0.0, ..ScoringConfig::default() };
        assert!(RecommendationEngine::new(&config).is_err());

        let config = ScoringConfig {
            weights: ScoringWeights { mba: -0.1, ..ScoringWeights::default() },
            ..ScoringConfig::default()
        };
        assert!(RecommendationEngine::new(&config).is_err());

        let config = ScoringConfig { trend_window: 0, ..ScoringConfig::default() };
        assert!(RecommendationEngine::new(&config).is_err());
    }

    #[test]
    fn every_product_is_ranked_once_with_bounded_components() {
        let snapshot = snapshot();
        let results = engine().score_snapshot(&snapshot, Focus::All, at(2025, 3, 20));

        assert_eq!(results.len(), snapshot.products.len());
        let mut ids: Vec<ProductId> = results.iter().map(|result| result.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), snapshot.products.len());

        for window in results.windows(2) {
            assert!(window[0].final_score >= window[1].final_score);
        }

        for result in &results {
            let c = &result.components;
            for value in [
                c.mba,
                c.content,
                c.collab,
                c.season,
                c.trend,
                c.forecast,
                c.stock,
                c.online_ratio,
                c.otc_ratio,
            ] {
                assert!((0.0..=1.0).contains(&value), "{value} out of range for {}", result.id);
            }
            assert!(c.total_sales >= 0);
            assert!(result.final_score.is_finite());
            for pair in &result.pairs {
                assert!((0.0..=1.0).contains(&pair.score));
            }
        }
    }

    #[test]
    fn zero_stock_product_gets_no_inventory_credit() {
        let results = engine().score_snapshot(&snapshot(), Focus::All, at(2025, 3, 20));
        let stapler = results.iter().find(|result| result.id == ProductId(4)).expect("stapler");
        assert_eq!(stapler.components.stock, 0.0);
    }

    #[test]
    fn empty_snapshot_yields_no_results() {
        let results = engine().score_snapshot(&DataSnapshot::default(), Focus::Online, at(2025, 3, 20));
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn parallel_and_sequential_scoring_agree() {
        let source = StaticSource(snapshot());
        let engine = engine();
        let as_of = at(2025, 3, 20);

        for focus in [Focus::All, Focus::Online, Focus::Otc] {
            let parallel = engine.compute_all_at(&source, focus, as_of).await.expect("compute");
            let sequential = engine.score_snapshot(&source.0, focus, as_of);
            assert_eq!(parallel, sequential);
        }
    }

    #[tokio::test]
    async fn repeated_computation_is_idempotent() {
        let source = StaticSource(snapshot());
        let engine = engine();
        let as_of = at(2025, 3, 20);

        let first = engine.compute_all_at(&source, Focus::All, as_of).await.expect("first");
        let second = engine.compute_all_at(&source, Focus::All, as_of).await.expect("second");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn source_failure_surfaces_as_persistence_error() {
        let error = engine()
            .compute_all(&UnreachableSource, Focus::All)
            .await
            .expect_err("source failure must propagate");

        assert!(matches!(error, ApplicationError::Persistence(_)));
        assert_eq!(error.error_class(), "data_source");
    }
}
