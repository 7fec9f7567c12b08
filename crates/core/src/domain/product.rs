use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub low_stock_threshold: Option<i64>,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ProductId(id),
            name: name.into(),
            description: String::new(),
            price: 0.0,
            low_stock_threshold: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = Some(threshold);
        self
    }

    /// Text fed to content similarity: name and description joined by a space.
    pub fn document(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}
