//! Failure taxonomy shared by adapters, caches and resolvers.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// Transient source failure: network, parse, provider error or rate limit.
    #[error("data unavailable: {0}")]
    Unavailable(String),

    /// Malformed user input. Callers substitute a default.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Every fallback tier failed.
    #[error("all sources exhausted for {0}")]
    Exhausted(String),
}

impl RateError {
    /// Builds an `Unavailable` from any error, keeping the full context chain.
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        RateError::Unavailable(format!("{:#}", err.into()))
    }

    /// Stable label for structured log fields.
    pub fn outcome(&self) -> &'static str {
        match self {
            RateError::Unavailable(_) => "unavailable",
            RateError::Invalid(_) => "invalid",
            RateError::Exhausted(_) => "exhausted",
        }
    }
}
