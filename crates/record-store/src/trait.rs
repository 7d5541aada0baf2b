//! RecordStore trait
//!
//! Abstracts the object store so reconcilers can run against either the
//! Kubernetes API or the in-memory mock. All methods are synchronous from
//! the scheduler's point of view: a call either persists or fails, and
//! failures translate to a requeue.

use crate::error::StoreError;
use crds::{Lease, Network, Pool};

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_pool(&self, namespace: &str, name: &str) -> Result<Pool, StoreError>;
    async fn list_pools(&self) -> Result<Vec<Pool>, StoreError>;
    /// Persists the main record (spec, metadata, annotations).
    async fn update_pool(&self, pool: &Pool) -> Result<Pool, StoreError>;
    /// Persists the status subresource only.
    async fn update_pool_status(&self, pool: &Pool) -> Result<Pool, StoreError>;

    async fn get_network(&self, namespace: &str, name: &str) -> Result<Network, StoreError>;
    async fn list_networks(&self) -> Result<Vec<Network>, StoreError>;
    async fn update_network(&self, network: &Network) -> Result<Network, StoreError>;

    async fn get_lease(&self, namespace: &str, name: &str) -> Result<Lease, StoreError>;
    async fn list_leases(&self) -> Result<Vec<Lease>, StoreError>;
    async fn update_lease(&self, lease: &Lease) -> Result<Lease, StoreError>;
    async fn update_lease_status(&self, lease: &Lease) -> Result<Lease, StoreError>;
    async fn delete_lease(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}
