use chrono::{NaiveDate, NaiveDateTime};

use shelfrank_core::config::ScoringConfig;
use shelfrank_core::recommend::{DataSnapshot, Focus, RecommendationEngine};
use shelfrank_core::{ApplicationError, ProductId};
use shelfrank_db::{
    connect_with_settings, migrations, DemoSeedDataset, InMemoryRecommendationSource,
    SqlRecommendationSource,
};

fn end_of_history() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 30)
        .and_then(|date| date.and_hms_opt(18, 0, 0))
        .expect("valid timestamp")
}

async fn seeded_source() -> SqlRecommendationSource {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    DemoSeedDataset::load(&pool).await.expect("seed");
    SqlRecommendationSource::new(pool)
}

fn engine() -> RecommendationEngine {
    RecommendationEngine::new(&ScoringConfig::default()).expect("engine")
}

#[tokio::test]
async fn seeded_catalog_is_fully_ranked_and_sorted() {
    let source = seeded_source().await;

    let results = engine()
        .compute_all_at(&source, Focus::All, end_of_history())
        .await
        .expect("compute recommendations");

    assert_eq!(results.len(), 10);
    for window in results.windows(2) {
        assert!(window[0].final_score >= window[1].final_score);
    }
    for result in &results {
        assert!(result.final_score.is_finite() && result.final_score >= 0.0);
        let c = &result.components;
        for value in [c.mba, c.content, c.collab, c.season, c.trend, c.forecast, c.stock] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!((c.online_ratio + c.otc_ratio - 1.0).abs() < 1e-9 || c.total_sales == 0);
    }

    let unsold = results.iter().find(|result| result.id == ProductId(10)).expect("photo paper");
    assert_eq!(unsold.components.total_sales, 0);
    assert_eq!(unsold.components.online_ratio, 0.0);
    assert!(unsold.pairs.is_empty());

    let out_of_stock =
        results.iter().find(|result| result.id == ProductId(8)).expect("correction tape");
    assert_eq!(out_of_stock.components.stock, 0.0);
}

#[tokio::test]
async fn recomputation_is_idempotent_and_matches_snapshot_scoring() {
    let source = seeded_source().await;
    let engine = engine();

    let first = engine.compute_all_at(&source, Focus::Online, end_of_history()).await.expect("first");
    let second =
        engine.compute_all_at(&source, Focus::Online, end_of_history()).await.expect("second");
    assert_eq!(first, second);

    let snapshot = DataSnapshot::load(&source).await.expect("snapshot");
    let memory = InMemoryRecommendationSource::new(snapshot.clone());
    let from_memory =
        engine.compute_all_at(&memory, Focus::Online, end_of_history()).await.expect("memory");
    assert_eq!(from_memory, first);
    assert_eq!(engine.score_snapshot(&snapshot, Focus::Online, end_of_history()), first);
}

#[tokio::test]
async fn online_focus_only_pairs_with_mostly_online_partners() {
    let source = seeded_source().await;

    let results =
        engine().compute_all_at(&source, Focus::Online, end_of_history()).await.expect("compute");

    for result in &results {
        for pair in &result.pairs {
            let partner =
                results.iter().find(|other| other.id == pair.product_id).expect("partner ranked");
            assert!(partner.components.online_ratio >= 0.5, "{} paired with {}", result.id, pair.product_id);
        }
    }
}

#[tokio::test]
async fn missing_schema_is_a_persistence_failure() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    let source = SqlRecommendationSource::new(pool);

    let error = engine()
        .compute_all(&source, Focus::All)
        .await
        .expect_err("unmigrated database must fail");

    assert!(matches!(error, ApplicationError::Persistence(_)));
}
