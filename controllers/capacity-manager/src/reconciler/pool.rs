//! Pool reconciler.
//!
//! Keeps the index's view of a pool current and maintains its derived
//! status. Every sight of a pool refreshes which cataloged subnets belong
//! to it (matched by virtualcenter against the pool's server); the capacity
//! calculator counts those alongside the pool's own topology entries. First
//! sight additionally stamps the finalizer, seeds status from spec totals,
//! and marks the pool initialized. Deletion removes the pool from the index
//! only: leases bound to it are reconciled independently.

use kube::Resource;
use tracing::{debug, info};

use crds::POOL_FINALIZER;

use crate::capacity;
use crate::error::ControllerError;

use super::Reconciler;

impl Reconciler {
    pub async fn reconcile_pool(&self, namespace: &str, name: &str) -> Result<(), ControllerError> {
        let mut pool = match self.store.get_pool(namespace, name).await {
            Ok(pool) => pool,
            Err(e) if e.is_not_found() => {
                let mut state = self.index.lock().await;
                state.remove_pool(name);
                self.metrics.update(&state);
                info!("pool {} removed from index", name);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if pool.meta().deletion_timestamp.is_some() {
            let mut state = self.index.lock().await;
            state.remove_pool(name);
            if let Some(finalizers) = pool.meta_mut().finalizers.as_mut() {
                finalizers.retain(|f| f != POOL_FINALIZER);
            }
            self.store.update_pool(&pool).await?;
            self.metrics.update(&state);
            info!("pool {} deleted", name);
            return Ok(());
        }

        let mut state = self.index.lock().await;

        let finalizers = pool.meta_mut().finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == POOL_FINALIZER) {
            finalizers.push(POOL_FINALIZER.to_string());
            pool = self.store.update_pool(&pool).await?;
        }

        // Resolve the pool's cataloged subnets; capacity derives network
        // availability from these plus the topology entries.
        let subnets: Vec<String> = self
            .catalog
            .subnets_for_server(&pool.spec.failure_domain.server)
            .iter()
            .map(|s| s.port_group_name.clone())
            .collect();
        state.pool_subnets.insert(name.to_string(), subnets.clone());

        let was_initialized = pool.status.as_ref().is_some_and(|s| s.initialized);
        if !was_initialized {
            let mut status = pool.status.clone().unwrap_or_default();
            status.vcpus_available = pool.spec.effective_vcpus();
            status.memory_available = pool.spec.memory;
            status.storage_available = pool.spec.storage;
            status.initialized = true;
            pool.status = Some(status);
            info!(
                "initializing pool {} with {} cataloged subnets",
                name,
                subnets.len()
            );
        }
        state.upsert_pool(pool);

        // Re-derive capacity for the whole fleet; persist whatever moved.
        // A freshly initialized pool persists even when the recompute lands
        // on the seeded values, so `initialized` is never lost.
        let mut to_persist = capacity::recompute(&mut state);
        if !was_initialized
            && !to_persist
                .iter()
                .any(|p| p.meta().name.as_deref() == Some(name))
        {
            if let Some(current) = state.pools.get(name) {
                to_persist.push(current.clone());
            }
        }
        for updated in &to_persist {
            self.store.update_pool_status(updated).await?;
        }
        if !to_persist.is_empty() {
            debug!(
                "pool {} reconcile updated {} pool statuses",
                name,
                to_persist.len()
            );
        }
        self.metrics.update(&state);
        Ok(())
    }
}
