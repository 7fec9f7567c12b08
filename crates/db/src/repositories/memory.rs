use tokio::sync::RwLock;

use shelfrank_core::domain::product::Product;
use shelfrank_core::domain::sales::{SalesLine, StockRow};
use shelfrank_core::errors::ApplicationError;
use shelfrank_core::recommend::{DataSnapshot, RecommendationSource};

/// Serves a fixed snapshot; `replace` swaps it between computations.
#[derive(Default)]
pub struct InMemoryRecommendationSource {
    snapshot: RwLock<DataSnapshot>,
}

impl InMemoryRecommendationSource {
    pub fn new(snapshot: DataSnapshot) -> Self {
        Self { snapshot: RwLock::new(snapshot) }
    }

    pub async fn replace(&self, snapshot: DataSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

#[async_trait::async_trait]
impl RecommendationSource for InMemoryRecommendationSource {
    async fn catalog(&self) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.snapshot.read().await.products.clone())
    }

    async fn sale_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
        Ok(self.snapshot.read().await.sale_lines.clone())
    }

    async fn order_lines(&self) -> Result<Vec<SalesLine>, ApplicationError> {
        Ok(self.snapshot.read().await.order_lines.clone())
    }

    async fn stock_rows(&self) -> Result<Vec<StockRow>, ApplicationError> {
        Ok(self.snapshot.read().await.stock.clone())
    }
}
