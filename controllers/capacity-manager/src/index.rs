//! Shared in-memory index.
//!
//! One mutex guards the process-wide view of pools, leases, and networks.
//! Every lease reconciliation holds the lock end to end, including across
//! store I/O: capacity decisions and their persisted effects must be
//! indivisible from the scheduler's perspective, and lease throughput is low
//! enough that this never becomes the bottleneck.
//!
//! The index is authoritative for derived state (remaining capacity, network
//! ownership); the record store stays authoritative for declared state.
//! Ownership back-edges are never stored: `accepted_leases` and
//! `network_owners` are queries over the lease map's owner references.

use std::collections::BTreeMap;

use kube::Resource;
use tokio::sync::{Mutex, MutexGuard};

use crds::{Lease, Network, NetworkType, Phase, Pool, NETWORK_KIND, POOL_KIND};

#[derive(Default)]
pub struct IndexState {
    /// Pool name → pool record.
    pub pools: BTreeMap<String, Pool>,
    /// `namespace/name` → lease record.
    pub leases: BTreeMap<String, Lease>,
    /// Network name → network record.
    pub networks: BTreeMap<String, Network>,
    /// Pool name → port-groups the subnet catalog grants the pool, matched
    /// by virtualcenter. Counted toward network availability alongside the
    /// pool's own topology entries.
    pub pool_subnets: BTreeMap<String, Vec<String>>,
}

pub struct SharedIndex {
    inner: Mutex<IndexState>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexState::default()),
        }
    }

    /// Acquires the global lock. Reconcilers hold the guard for the whole
    /// reconcile, including store I/O.
    pub async fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.inner.lock().await
    }

    /// Short read-or-mutate access for callers that do no I/O under the lock.
    pub async fn with_lock<R>(&self, f: impl FnOnce(&mut IndexState) -> R) -> R {
        let mut state = self.inner.lock().await;
        f(&mut state)
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexState {
    pub fn upsert_pool(&mut self, pool: Pool) {
        if let Some(name) = pool.meta().name.clone() {
            self.pools.insert(name, pool);
        }
    }

    pub fn remove_pool(&mut self, name: &str) {
        self.pools.remove(name);
        self.pool_subnets.remove(name);
    }

    pub fn upsert_network(&mut self, network: Network) {
        if let Some(name) = network.meta().name.clone() {
            self.networks.insert(name, network);
        }
    }

    pub fn remove_network(&mut self, name: &str) {
        self.networks.remove(name);
    }

    pub fn upsert_lease(&mut self, lease: Lease) {
        self.leases.insert(lease.key(), lease);
    }

    pub fn remove_lease(&mut self, key: &str) {
        self.leases.remove(key);
    }

    /// Non-terminating leases holding an owner reference to the pool. These
    /// are the leases whose demand counts against the pool's capacity.
    pub fn accepted_leases(&self, pool_name: &str) -> Vec<&Lease> {
        self.leases
            .values()
            .filter(|l| !l.is_terminating() && l.owns(POOL_KIND, pool_name))
            .collect()
    }

    /// Non-terminating leases holding an owner reference to the network.
    pub fn network_owners(&self, network_name: &str) -> Vec<&Lease> {
        self.leases
            .values()
            .filter(|l| !l.is_terminating() && l.owns(NETWORK_KIND, network_name))
            .collect()
    }

    /// The oldest non-terminating, not-yet-fulfilled lease of the given
    /// network type. Deletion and fulfillment bump this lease so waiters
    /// advance.
    pub fn oldest_unfulfilled(
        &self,
        network_type: NetworkType,
        exclude_key: Option<&str>,
    ) -> Option<&Lease> {
        self.leases
            .values()
            .filter(|l| {
                exclude_key != Some(l.key().as_str())
                    && !l.is_terminating()
                    && l.network_type() == network_type
                    && !matches!(l.phase(), Phase::Fulfilled | Phase::Failed)
            })
            .min_by_key(|l| l.meta().creation_timestamp.clone())
    }
}
