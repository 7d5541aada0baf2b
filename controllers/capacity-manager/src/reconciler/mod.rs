//! Reconcilers.
//!
//! One `Reconciler` instance is shared by all watchers. Each reconcile
//! re-fetches its record through the store, takes the shared index lock, and
//! persists its effects before releasing it. The lease reconciler is the
//! core; pool, network, and namespace reconcilers keep the index current and
//! handle lifecycle edges.

mod lease;
mod namespace;
mod network;
mod pool;


use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kube::Resource;
use record_store::RecordStore;
use tracing::info;

use crate::error::ControllerError;
use crate::fit::AllocationStrategy;
use crate::index::SharedIndex;
use crate::metrics::Metrics;
use crate::subnets::SubnetCatalog;

#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Lets multi-tenant leases fall back to single-tenant networks when no
    /// multi-tenant candidate exists in the target pool.
    pub allow_multi_tenant_fallback: bool,
    pub strategy: AllocationStrategy,
}

pub struct Reconciler {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) index: SharedIndex,
    pub(crate) metrics: Metrics,
    pub(crate) catalog: SubnetCatalog,
    pub(crate) config: SchedulerConfig,
    /// Consecutive error count per record key, feeding the requeue backoff.
    errors: Mutex<HashMap<String, u32>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        catalog: SubnetCatalog,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            index: SharedIndex::new(),
            metrics: Metrics::new(),
            catalog,
            config,
            errors: Mutex::new(HashMap::new()),
        }
    }

    #[allow(dead_code)] // consumed by the metrics endpoint wiring
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Rebuilds the index from a full list of all three kinds. Run once at
    /// startup so partial state persisted before a restart is visible before
    /// the first watch event arrives.
    pub async fn prime(&self) -> Result<(), ControllerError> {
        let pools = self.store.list_pools().await?;
        let networks = self.store.list_networks().await?;
        let leases = self.store.list_leases().await?;

        let mut state = self.index.lock().await;
        for pool in pools {
            if let Some(name) = pool.meta().name.clone() {
                let subnets = self
                    .catalog
                    .subnets_for_server(&pool.spec.failure_domain.server)
                    .iter()
                    .map(|s| s.port_group_name.clone())
                    .collect();
                state.pool_subnets.insert(name, subnets);
            }
            state.upsert_pool(pool);
        }
        for network in networks {
            state.upsert_network(network);
        }
        for lease in leases {
            state.upsert_lease(lease);
        }
        crate::capacity::recompute(&mut state);
        self.metrics.update(&state);
        info!(
            pools = state.pools.len(),
            networks = state.networks.len(),
            leases = state.leases.len(),
            "index primed from store"
        );
        Ok(())
    }

    pub(crate) fn increment_error(&self, key: &str) -> u32 {
        let mut errors = self.errors.lock().expect("error map poisoned");
        let count = errors.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub(crate) fn reset_error(&self, key: &str) {
        self.errors.lock().expect("error map poisoned").remove(key);
    }

    pub(crate) fn error_count(&self, key: &str) -> u32 {
        self.errors
            .lock()
            .expect("error map poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}
