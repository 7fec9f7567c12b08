use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Catalog rows the demo dataset must contain.
const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct { id: 1, name: "A4 Bond Paper" },
    SeedProduct { id: 2, name: "Long Bond Paper" },
    SeedProduct { id: 3, name: "Ballpen Black" },
    SeedProduct { id: 4, name: "Ballpen Blue" },
    SeedProduct { id: 5, name: "Stapler" },
    SeedProduct { id: 6, name: "Staple Wire #35" },
    SeedProduct { id: 7, name: "Expanding Envelope" },
    SeedProduct { id: 8, name: "Correction Tape" },
    SeedProduct { id: 9, name: "Yellow Pad Paper" },
    SeedProduct { id: 10, name: "Photo Paper Glossy" },
];

/// Expected row count per table for the seeded id range.
const SEED_ROW_COUNTS: &[(&str, i64)] = &[
    ("products", 10),
    ("sales", 12),
    ("sale_items", 28),
    ("orders", 8),
    ("order_items", 16),
    ("stocks", 10),
];

/// Seeded ids run from 1 to this bound in every table.
const SEED_MAX_ID: i64 = 100;

const UNSOLD_PRODUCT_ID: i64 = 10;
const OUT_OF_STOCK_PRODUCT_ID: i64 = 8;

/// Demo dataset for a small stationery shop.
///
/// Six months (January to June 2025) of in-store sales and online orders
/// over ten products, with one product that never sold and one that is out
/// of stock. Loading is idempotent.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let mut tables_seeded = Vec::with_capacity(SEED_ROW_COUNTS.len());
        for &(table, _) in SEED_ROW_COUNTS {
            let rows = count_seeded_rows(pool, table).await?;
            tables_seeded.push(TableSeedInfo { table, rows });
        }

        Ok(SeedResult { products_seeded: SEED_PRODUCTS.len(), tables_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (table, expected) in SEED_ROW_COUNTS {
            let rows = count_seeded_rows(pool, table).await?;
            checks.push((*table, rows == *expected));
        }

        let mut catalog_ok = true;
        for product in SEED_PRODUCTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1 AND name = ?2)",
            )
            .bind(product.id)
            .bind(product.name)
            .fetch_one(pool)
            .await?;
            catalog_ok &= exists == 1;
        }
        checks.push(("catalog-names", catalog_ok));

        let unsold_lines: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(1) FROM sale_items WHERE product_id = ?1)
                  + (SELECT COUNT(1) FROM order_items WHERE product_id = ?1)",
        )
        .bind(UNSOLD_PRODUCT_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("unsold-product", unsold_lines == 0));

        let out_of_stock: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM stocks WHERE product_id = ?1 AND quantity = 0)",
        )
        .bind(OUT_OF_STOCK_PRODUCT_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("out-of-stock-product", out_of_stock == 1));

        let (first_month, last_month): (Option<String>, Option<String>) = sqlx::query_as(
            "SELECT MIN(month), MAX(month) FROM (
                 SELECT strftime('%Y-%m', datetime_sold) AS month FROM sales WHERE id <= ?1
                 UNION ALL
                 SELECT strftime('%Y-%m', datetime_order) AS month FROM orders WHERE id <= ?1
             )",
        )
        .bind(SEED_MAX_ID)
        .fetch_one(pool)
        .await?;
        checks.push((
            "history-window",
            first_month.as_deref() == Some("2025-01") && last_month.as_deref() == Some("2025-06"),
        ));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows, children first.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for table in ["sale_items", "order_items", "stocks", "sales", "orders", "products"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE id <= ?1"))
                .bind(SEED_MAX_ID)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn count_seeded_rows(pool: &DbPool, table: &str) -> Result<i64, RepositoryError> {
    let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id <= ?1"))
        .bind(SEED_MAX_ID)
        .fetch_one(pool)
        .await?;
    Ok(rows)
}

#[derive(Debug, Clone, Copy)]
struct SeedProduct {
    id: i64,
    name: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub tables_seeded: Vec<TableSeedInfo>,
}

#[derive(Debug)]
pub struct TableSeedInfo {
    pub table: &'static str,
    pub rows: i64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
