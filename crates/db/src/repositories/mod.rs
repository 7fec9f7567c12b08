use thiserror::Error;

use shelfrank_core::errors::ApplicationError;

pub mod memory;
pub mod recommendation;

pub use memory::InMemoryRecommendationSource;
pub use recommendation::SqlRecommendationSource;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use shelfrank_core::errors::ApplicationError;

    use super::RepositoryError;

    #[test]
    fn repository_errors_become_persistence_failures() {
        let error = ApplicationError::from(RepositoryError::Decode("bad timestamp".to_string()));

        assert_eq!(error, ApplicationError::Persistence("decode error: bad timestamp".to_string()));
        assert_eq!(error.error_class(), "data_source");
    }
}
