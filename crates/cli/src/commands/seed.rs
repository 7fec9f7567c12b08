use crate::commands::{prepare, CommandResult};
use shelfrank_db::{connect_with_config, migrations, DemoSeedDataset, TableSeedInfo};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<Vec<TableSeedInfo>, (&'static str, String, u8)> =
            if verification.all_present {
                Ok(seed_result.tables_seeded)
            } else {
                Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(tables) => {
            let table_lines: Vec<String> = tables
                .iter()
                .map(|info| format!("  - {}: {} rows", info.table, info.rows))
                .collect();
            let message = format!(
                "demo stationery dataset loaded (January to June 2025):\n{}",
                table_lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(checks: &[(&str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
