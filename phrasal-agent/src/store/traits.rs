//! Expression store contract.

use async_trait::async_trait;
use serde_json::Value;

use phrasal_core::LearningBundle;

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistent storage of validated bundles, keyed by normalized expression.
#[async_trait]
pub trait ExpressionStore: Send + Sync {
    /// Bundle stored under exactly this expression.
    async fn lookup_exact(&self, expression: &str) -> Result<Option<LearningBundle>, StoreError>;

    /// Raw candidate rows for expressions resembling `query`.
    ///
    /// Rows are untrusted and go through the sanitizer.
    async fn lookup_fuzzy(&self, query: &str) -> Result<Vec<Value>, StoreError>;

    /// Store a validated bundle under its expression, replacing any previous one.
    async fn persist(&self, bundle: &LearningBundle) -> Result<(), StoreError>;
}
