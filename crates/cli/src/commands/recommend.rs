use serde::Serialize;
use shelfrank_core::errors::ApplicationError;
use shelfrank_core::recommend::{Focus, RankedResult, RecommendationEngine};
use shelfrank_db::{connect_with_config, migrations, DbPool, SqlRecommendationSource};

use crate::commands::{prepare, CommandResult};

#[derive(Debug, Serialize)]
struct RecommendationEnvelope<'a> {
    focus: Focus,
    count: usize,
    results: &'a [RankedResult],
}

pub fn run(focus: Focus, limit: Option<usize>, json_output: bool) -> CommandResult {
    let (config, runtime) = match prepare("recommend") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let engine = match RecommendationEngine::new(&config.scoring) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure("recommend", "domain_validation", error.to_string(), 2);
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return Err(("migration", error.to_string(), 5u8));
        }

        rank_and_close(pool, &engine, focus)
            .await
            .map_err(|error| (error.error_class(), error.to_string(), exit_code_for(&error)))
    });

    let mut ranked = match result {
        Ok(ranked) => ranked,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("recommend", error_class, message, exit_code);
        }
    };
    let catalog_size = ranked.len();
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    if json_output {
        let envelope = RecommendationEnvelope { focus, count: ranked.len(), results: &ranked };
        return match serde_json::to_string_pretty(&envelope) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("recommend", "serialization", error.to_string(), 3),
        };
    }

    CommandResult { exit_code: 0, output: render_human(focus, &ranked, catalog_size) }
}

/// Ranks from the pool and closes it whether or not ranking succeeded.
async fn rank_and_close(
    pool: DbPool,
    engine: &RecommendationEngine,
    focus: Focus,
) -> Result<Vec<RankedResult>, ApplicationError> {
    let source = SqlRecommendationSource::new(pool.clone());
    let ranked = engine.compute_all(&source, focus).await;
    pool.close().await;
    ranked
}

fn exit_code_for(error: &ApplicationError) -> u8 {
    match error {
        ApplicationError::Domain(_) | ApplicationError::Configuration(_) => 2,
        ApplicationError::Internal(_) => 3,
        ApplicationError::Persistence(_) => 4,
    }
}

fn render_human(focus: Focus, ranked: &[RankedResult], catalog_size: usize) -> String {
    let mut lines = vec![format!(
        "recommendations (focus: {}, showing {} of {} products):",
        focus.as_str(),
        ranked.len(),
        catalog_size
    )];

    if ranked.is_empty() {
        lines.push("- no products in catalog".to_string());
        return lines.join("\n");
    }

    for (rank, result) in ranked.iter().enumerate() {
        let components = &result.components;
        lines.push(format!(
            "{:>3}. [{}] {} score={:.4} sales={} mba={:.2} content={:.2} collab={:.2} season={:.2} trend={:.2} forecast={:.2} stock={:.2}",
            rank + 1,
            result.id,
            result.name,
            result.final_score,
            components.total_sales,
            components.mba,
            components.content,
            components.collab,
            components.season,
            components.trend,
            components.forecast,
            components.stock,
        ));
        if !result.pairs.is_empty() {
            let partners: Vec<String> = result
                .pairs
                .iter()
                .map(|pair| format!("{} ({:.2})", pair.name, pair.score))
                .collect();
            lines.push(format!("     pairs with: {}", partners.join(", ")));
        }
    }

    lines.join("\n")
}
