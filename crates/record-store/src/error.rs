//! Record store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist. Reconcilers treat this as "work vanished",
    /// not as a failure.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> StoreError {
        StoreError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }
}
