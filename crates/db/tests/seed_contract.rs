use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct HistoryWindow {
    first_month: String,
    last_month: String,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset_version: String,
    seed_dataset: String,
    products: Vec<SeedProduct>,
    row_counts: BTreeMap<String, i64>,
    unsold_product_ids: Vec<i64>,
    out_of_stock_product_ids: Vec<i64>,
    history_window: HistoryWindow,
}

fn load_contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/demo_seed_contract.json"))
        .map_err(|error| format!("seed contract JSON must parse: {error}"))
}

/// Rows of one `INSERT ... VALUES` block, split on the leading `(`.
fn value_rows<'a>(sql: &'a str, table: &str) -> Vec<&'a str> {
    let header = format!("INSERT OR IGNORE INTO {table} ");
    let Some(start) = sql.find(&header) else {
        return Vec::new();
    };
    let block = &sql[start..];
    let end = block.find(';').unwrap_or(block.len());
    block[..end]
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('('))
        .collect()
}

/// Splits a `(a, b, c),` value row into its column literals.
fn row_columns(row: &str) -> Vec<&str> {
    row.trim_end_matches([',', ';'])
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(", ")
        .collect()
}

#[test]
fn seed_contract_matches_demo_seed_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/demo_seed.sql");
    let contract = load_contract()?;

    require_eq!(contract.dataset_version, "demo-2025h1");
    require_eq!(contract.seed_dataset, "deterministic_stationery_demo");

    let mut ids_seen = HashSet::new();
    for product in &contract.products {
        require!(ids_seen.insert(product.id), "duplicate product id {}", product.id);
        require!(
            fixture_sql.contains(&format!("({}, '{}'", product.id, product.name)),
            "seed SQL fixture should include product {} `{}`",
            product.id,
            product.name
        );
    }

    for (table, expected) in &contract.row_counts {
        let rows = value_rows(fixture_sql, table).len() as i64;
        require_eq!(rows, *expected, "table {table} has {rows} seeded rows, expected {expected}");
    }
    require_eq!(contract.row_counts.get("products").copied(), Some(contract.products.len() as i64));
    Ok(())
}

#[test]
fn unsold_and_out_of_stock_products_are_seeded_as_declared() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/demo_seed.sql");
    let contract = load_contract()?;

    let line_rows: Vec<&str> = value_rows(fixture_sql, "sale_items")
        .into_iter()
        .chain(value_rows(fixture_sql, "order_items"))
        .collect();
    for unsold in &contract.unsold_product_ids {
        let unsold = unsold.to_string();
        let referenced =
            line_rows.iter().any(|row| row_columns(row).get(2) == Some(&unsold.as_str()));
        require!(!referenced, "product {unsold} should have no sale or order lines");
    }

    let stock_rows = value_rows(fixture_sql, "stocks");
    for empty in &contract.out_of_stock_product_ids {
        let product_id = empty.to_string();
        let zero_stock = stock_rows.iter().any(|row| {
            let columns = row_columns(row);
            columns.get(1) == Some(&product_id.as_str()) && columns.get(2) == Some(&"0")
        });
        require!(zero_stock, "product {empty} should be seeded with zero stock");
    }
    Ok(())
}

#[test]
fn history_window_matches_seeded_timestamps() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/demo_seed.sql");
    let contract = load_contract()?;

    let mut months: Vec<&str> = value_rows(fixture_sql, "sales")
        .into_iter()
        .chain(value_rows(fixture_sql, "orders"))
        .filter_map(|row| row.split('\'').nth(1))
        .map(|timestamp| &timestamp[..7])
        .collect();
    months.sort_unstable();

    require_eq!(months.first().copied(), Some(contract.history_window.first_month.as_str()));
    require_eq!(months.last().copied(), Some(contract.history_window.last_month.as_str()));
    Ok(())
}
