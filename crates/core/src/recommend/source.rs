//! Data access seam for the engine

use async_trait::async_trait;

use crate::domain::product::Product;
use crate::domain::sales::{SalesLine, StockRow};
use crate::errors::ApplicationError;

/// Bulk reads the engine needs for one computation. Implementations report
/// connectivity or query failures as [`ApplicationError::Persistence`].
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Catalog rows in their canonical order.
    async fn catalog(&self) -> Result<Vec<Product>, ApplicationError>;
    async fn sale_lines(&self) -> Result<Vec<SalesLine>, ApplicationError>;
    async fn order_lines(&self) -> Result<Vec<SalesLine>, ApplicationError>;
    async fn stock_rows(&self) -> Result<Vec<StockRow>, ApplicationError>;
}

/// Everything read from a source for one computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSnapshot {
    pub products: Vec<Product>,
    pub sale_lines: Vec<SalesLine>,
    pub order_lines: Vec<SalesLine>,
    pub stock: Vec<StockRow>,
}

impl DataSnapshot {
    /// Reads the four row sets concurrently.
    pub async fn load<S>(source: &S) -> Result<Self, ApplicationError>
    where
        S: RecommendationSource + ?Sized,
    {
        let (products, sale_lines, order_lines, stock) = tokio::try_join!(
            source.catalog(),
            source.sale_lines(),
            source.order_lines(),
            source.stock_rows()
        )?;

        Ok(Self { products, sale_lines, order_lines, stock })
    }

    /// Sale lines followed by order lines.
    pub fn all_lines(&self) -> impl Iterator<Item = &SalesLine> {
        self.sale_lines.iter().chain(self.order_lines.iter())
    }
}
