//! Controller-specific error types.

use record_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the capacity-manager reconcilers. Every variant maps
/// to a requeue with backoff; the scheduling wait states (`NoAvailablePool`,
/// `LeaseDelayed`, `NetworkInUse`) additionally leave an explanatory
/// condition on the record before returning.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// No pool passed the candidate filter for a pending lease.
    #[error("no available pool: {0}")]
    NoAvailablePool(String),

    /// The lease must wait behind an older peer.
    #[error("lease delayed behind {0}")]
    LeaseDelayed(String),

    /// A terminating network still has lease owners.
    #[error("network still in use: {0}")]
    NetworkInUse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("subnet catalog error: {0}")]
    Catalog(String),

    #[error("resource watch failed: {0}")]
    Watch(String),
}
