//! Error types for the arc-routing search engine.
//!
//! Constraint violations (load or duration) are not errors: the feasibility
//! checker reports them as verdicts. Only contract failures and instance
//! loading problems surface here.

use crate::validation::Violation;
use thiserror::Error;

/// Errors raised by the search engine and the instance loaders.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
    /// A move descriptor no longer matches the solution it is applied to.
    #[error("move no longer matches the solution: {0}")]
    InconsistentMove(String),
    /// Post-move validation found the solution bookkeeping out of sync.
    #[error("structural invariant broken after {context}: {} violation(s)\n{dump}", violations.len())]
    InvariantBroken {
        context: String,
        violations: Vec<Violation>,
        dump: String,
    },
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    pub fn invalid_instance(message: impl Into<String>) -> Self {
        Self::InvalidInstance(message.into())
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentMove(message.into())
    }
}
