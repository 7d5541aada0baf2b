//! In-memory record store for tests.
//!
//! Holds records in maps keyed by `namespace/name` and imitates the two
//! store behaviors the scheduler depends on:
//! - a delete against a record with finalizers only marks it terminating
//!   (sets `deletionTimestamp`); the record stays visible,
//! - an update that leaves a terminating record with no finalizers removes
//!   it for good.
//!
//! UIDs and creation timestamps are assigned on insert when absent so owner
//! references and fairness ordering behave as they do against the real API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::Resource;

use crate::error::StoreError;
use crate::store_trait::RecordStore;
use crds::{Lease, Network, Pool, LEASE_KIND, NETWORK_KIND, POOL_KIND};

#[derive(Clone, Default)]
pub struct MockStore {
    pools: Arc<Mutex<HashMap<String, Pool>>>,
    networks: Arc<Mutex<HashMap<String, Network>>>,
    leases: Arc<Mutex<HashMap<String, Lease>>>,
    next_uid: Arc<Mutex<u64>>,
}

fn key_of<K: Resource>(record: &K) -> String {
    format!(
        "{}/{}",
        record.meta().namespace.as_deref().unwrap_or("default"),
        record.meta().name.as_deref().unwrap_or_default()
    )
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_identity<K: Resource>(&self, record: &mut K) {
        let meta = record.meta_mut();
        if meta.uid.is_none() {
            let mut counter = self.next_uid.lock().unwrap();
            *counter += 1;
            meta.uid = Some(format!("mock-uid-{:04}", *counter));
        }
        if meta.creation_timestamp.is_none() {
            meta.creation_timestamp = Some(Time(Utc::now()));
        }
    }

    /// Inserts a pool, assigning uid and creation timestamp. Test setup.
    pub fn add_pool(&self, mut pool: Pool) -> Pool {
        self.assign_identity(&mut pool);
        self.pools
            .lock()
            .unwrap()
            .insert(key_of(&pool), pool.clone());
        pool
    }

    pub fn add_network(&self, mut network: Network) -> Network {
        self.assign_identity(&mut network);
        self.networks
            .lock()
            .unwrap()
            .insert(key_of(&network), network.clone());
        network
    }

    pub fn add_lease(&self, mut lease: Lease) -> Lease {
        self.assign_identity(&mut lease);
        self.leases
            .lock()
            .unwrap()
            .insert(key_of(&lease), lease.clone());
        lease
    }

    fn sorted<T: Clone>(map: &HashMap<String, T>) -> Vec<T> {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        keys.into_iter().map(|k| map[k].clone()).collect()
    }
}

#[async_trait::async_trait]
impl RecordStore for MockStore {
    async fn get_pool(&self, namespace: &str, name: &str) -> Result<Pool, StoreError> {
        let key = format!("{}/{}", namespace, name);
        self.pools
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(POOL_KIND, key))
    }

    async fn list_pools(&self) -> Result<Vec<Pool>, StoreError> {
        Ok(Self::sorted(&self.pools.lock().unwrap()))
    }

    async fn update_pool(&self, pool: &Pool) -> Result<Pool, StoreError> {
        self.pools
            .lock()
            .unwrap()
            .insert(key_of(pool), pool.clone());
        Ok(pool.clone())
    }

    async fn update_pool_status(&self, pool: &Pool) -> Result<Pool, StoreError> {
        let mut pools = self.pools.lock().unwrap();
        let key = key_of(pool);
        let stored = pools
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(POOL_KIND, key))?;
        stored.status = pool.status.clone();
        Ok(stored.clone())
    }

    async fn get_network(&self, namespace: &str, name: &str) -> Result<Network, StoreError> {
        let key = format!("{}/{}", namespace, name);
        self.networks
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(NETWORK_KIND, key))
    }

    async fn list_networks(&self) -> Result<Vec<Network>, StoreError> {
        Ok(Self::sorted(&self.networks.lock().unwrap()))
    }

    async fn update_network(&self, network: &Network) -> Result<Network, StoreError> {
        let mut networks = self.networks.lock().unwrap();
        let key = key_of(network);
        let terminating = network.meta().deletion_timestamp.is_some();
        let finalized = network
            .meta()
            .finalizers
            .as_ref()
            .map_or(true, |f| f.is_empty());
        if terminating && finalized {
            networks.remove(&key);
        } else {
            networks.insert(key, network.clone());
        }
        Ok(network.clone())
    }

    async fn get_lease(&self, namespace: &str, name: &str) -> Result<Lease, StoreError> {
        let key = format!("{}/{}", namespace, name);
        self.leases
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(LEASE_KIND, key))
    }

    async fn list_leases(&self) -> Result<Vec<Lease>, StoreError> {
        Ok(Self::sorted(&self.leases.lock().unwrap()))
    }

    async fn update_lease(&self, lease: &Lease) -> Result<Lease, StoreError> {
        let mut leases = self.leases.lock().unwrap();
        let key = key_of(lease);
        let terminating = lease.meta().deletion_timestamp.is_some();
        let finalized = lease
            .meta()
            .finalizers
            .as_ref()
            .map_or(true, |f| f.is_empty());
        if terminating && finalized {
            leases.remove(&key);
        } else {
            leases.insert(key, lease.clone());
        }
        Ok(lease.clone())
    }

    async fn update_lease_status(&self, lease: &Lease) -> Result<Lease, StoreError> {
        let mut leases = self.leases.lock().unwrap();
        let key = key_of(lease);
        let stored = leases
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(LEASE_KIND, key))?;
        stored.status = lease.status.clone();
        Ok(stored.clone())
    }

    async fn delete_lease(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let mut leases = self.leases.lock().unwrap();
        let key = format!("{}/{}", namespace, name);
        let Some(stored) = leases.get_mut(&key) else {
            // Already gone; deletion is idempotent.
            return Ok(());
        };
        let has_finalizers = stored
            .meta()
            .finalizers
            .as_ref()
            .is_some_and(|f| !f.is_empty());
        if has_finalizers {
            if stored.meta().deletion_timestamp.is_none() {
                stored.meta_mut().deletion_timestamp = Some(Time(Utc::now()));
            }
        } else {
            leases.remove(&key);
        }
        Ok(())
    }
}
