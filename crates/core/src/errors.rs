use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in CLI outcomes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_validation",
            Self::Persistence(_) => "data_source",
            Self::Configuration(_) => "config_validation",
            Self::Internal(_) => "internal",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => "The scoring configuration is invalid. Check inputs and try again.",
            Self::Persistence(_) => {
                "The data source is temporarily unavailable. Please retry shortly."
            }
            Self::Configuration(_) => "The service is misconfigured.",
            Self::Internal(_) => "An unexpected internal error occurred.",
        }
    }
}
