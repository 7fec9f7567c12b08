use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use shelfrank_core::domain::product::{Product, ProductId};
use shelfrank_core::domain::sales::{Channel, SalesLine, StockRow};
use shelfrank_core::errors::ApplicationError;
use shelfrank_core::recommend::RecommendationSource;

use super::RepositoryError;
use crate::DbPool;

const CATALOG_QUERY: &str = "SELECT id, name, description, price, low_stock_warning_threshold
     FROM products
     ORDER BY id";

const SALE_LINES_QUERY: &str = "SELECT s.id AS transaction_id,
            si.product_id AS product_id,
            COALESCE(si.quantity, 0) AS quantity,
            s.datetime_sold AS occurred_at
     FROM sale_items si
     INNER JOIN sales s ON s.id = si.sale_id
     WHERE si.product_id IS NOT NULL
     ORDER BY s.id, si.id";

const ORDER_LINES_QUERY: &str = "SELECT o.id AS transaction_id,
            oi.product_id AS product_id,
            COALESCE(oi.quantity, 0) AS quantity,
            o.datetime_order AS occurred_at
     FROM order_items oi
     INNER JOIN orders o ON o.id = oi.order_id
     WHERE oi.product_id IS NOT NULL
     ORDER BY o.id, oi.id";

const STOCK_QUERY: &str = "SELECT product_id, quantity FROM stocks ORDER BY id";

/// Reads the catalog, both channels and stock straight from SQLite.
#[derive(Clone)]
pub struct SqlRecommendationSource {
    pool: DbPool,
}

impl SqlRecommendationSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(CATALOG_QUERY).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn fetch_lines(
        &self,
        query: &'static str,
        channel: Channel,
    ) -> Result<Vec<SalesLine>, RepositoryError> {
        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        let lines = rows
            .iter()
            .map(|row| row_to_sales_line(row, channel))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            event_name = "recommend.source.lines_loaded",
            channel = ?channel,
            rows = lines.len(),
            "sales lines loaded"
        );
        Ok(lines)
    }

    async fn fetch_stock(&self) -> Result<Vec<StockRow>, RepositoryError> {
        let rows = sqlx::query(STOCK_QUERY).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_stock).collect()
    }
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: Option<String> =
        row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price: f64 = row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let low_stock_threshold: Option<i64> = row
        .try_get("low_stock_warning_threshold")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Product {
        id: ProductId(id),
        name: name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        price,
        low_stock_threshold,
    })
}

fn row_to_sales_line(row: &SqliteRow, channel: Channel) -> Result<SalesLine, RepositoryError> {
    let transaction_id: i64 =
        row.try_get("transaction_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let occurred_at: NaiveDateTime =
        row.try_get("occurred_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(SalesLine {
        channel,
        transaction_id,
        product_id: ProductId(product_id),
        quantity,
        occurred_at,
    })
}

fn row_to_stock(row: &SqliteRow) -> Result<StockRow, RepositoryError> {
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StockRow { product_id: ProductId(product_id), quantity })
}

#[async_trait::async_trait]
impl RecommendationSource for SqlRecommendationSource {
    async fn catalog(&self) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.fetch_products().await?)
    }

    async fn sale_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
        Ok(self.fetch_lines(SALE_LINES_QUERY, Channel::Otc).await?)
    }

    async fn order_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
        Ok(self.fetch_lines(ORDER_LINES_QUERY, Channel::Online).await?)
    }

    async fn stock_rows(&self) -> Result<Vec<StockRow>, ApplicationError> {
        Ok(self.fetch_stock().await?)
    }
}

#[cfg(test)]
mod tests {
    use shelfrank_core::domain::product::ProductId;
    use shelfrank_core::domain::sales::Channel;
    use shelfrank_core::errors::ApplicationError;
    use shelfrank_core::recommend::RecommendationSource;

    use super::SqlRecommendationSource;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn exec(pool: &sqlx::SqlitePool, sql: &str) {
        sqlx::query(sql).execute(pool).await.expect("execute statement");
    }

    async fn seed_minimal(pool: &sqlx::SqlitePool) {
        exec(
            pool,
            "INSERT INTO products (id, name, description, price, low_stock_warning_threshold) VALUES
                (3, 'Stapler', NULL, 120.0, NULL),
                (1, 'Bond paper', 'A4 white bond paper', 250.0, 10),
                (2, 'Ballpen', 'black ink', 12.5, 20)",
        )
        .await;
        exec(
            pool,
            "INSERT INTO sales (id, datetime_sold) VALUES
                (1, '2025-01-04 09:15:00'),
                (2, '2025-02-09 16:40:00')",
        )
        .await;
        exec(
            pool,
            "INSERT INTO sale_items (id, sale_id, product_id, quantity) VALUES
                (1, 1, 1, 3),
                (2, 1, 2, NULL),
                (3, 2, NULL, 5),
                (4, 2, 3, 1)",
        )
        .await;
        exec(pool, "INSERT INTO orders (id, datetime_order) VALUES (1, '2025-03-01 11:00:00')")
            .await;
        exec(
            pool,
            "INSERT INTO order_items (id, order_id, product_id, quantity) VALUES (1, 1, 2, 4)",
        )
        .await;
        exec(pool, "INSERT INTO stocks (id, product_id, quantity) VALUES (1, 1, 12), (2, 3, 0)")
            .await;
    }

    #[tokio::test]
    async fn catalog_is_ordered_by_id_with_optional_columns_defaulted() {
        let pool = setup().await;
        seed_minimal(&pool).await;
        let source = SqlRecommendationSource::new(pool);

        let products = source.catalog().await.expect("catalog");

        let ids: Vec<i64> = products.iter().map(|product| product.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(products[0].low_stock_threshold, Some(10));
        assert_eq!(products[2].description, "");
        assert_eq!(products[2].low_stock_threshold, None);
    }

    #[tokio::test]
    async fn sale_lines_skip_null_products_and_default_null_quantity() {
        let pool = setup().await;
        seed_minimal(&pool).await;
        let source = SqlRecommendationSource::new(pool);

        let lines = source.sale_lines().await.expect("sale lines");

        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.channel == Channel::Otc));
        let ballpen = lines.iter().find(|line| line.product_id == ProductId(2)).expect("ballpen");
        assert_eq!(ballpen.quantity, 0);
        assert_eq!(ballpen.transaction_id, 1);
        assert_eq!(ballpen.occurred_at.to_string(), "2025-01-04 09:15:00");
    }

    #[tokio::test]
    async fn order_lines_and_stock_are_read() {
        let pool = setup().await;
        seed_minimal(&pool).await;
        let source = SqlRecommendationSource::new(pool);

        let orders = source.order_lines().await.expect("order lines");
        let stock = source.stock_rows().await.expect("stock");

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].channel, Channel::Online);
        assert_eq!(orders[0].quantity, 4);
        assert_eq!(stock.len(), 2);
        assert_eq!(stock[1].product_id, ProductId(3));
        assert_eq!(stock[1].quantity, 0);
    }

    #[tokio::test]
    async fn unmigrated_database_reports_persistence_failure() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        let source = SqlRecommendationSource::new(pool);

        let error = source.catalog().await.expect_err("missing tables must fail");
        assert!(matches!(error, ApplicationError::Persistence(_)));
    }
}
