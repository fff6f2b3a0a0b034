use thiserror::Error;

/// Errors produced by a search strategy.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The semantic strategy was asked to run but its embedding model is
    /// missing or failed to load. Raised at first use, not construction.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// The embedding model misbehaved (wrong output arity, failed call).
    #[error("embedding failed: {0}")]
    Embedding(String),
}
