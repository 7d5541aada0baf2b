//! Prometheus gauges.
//!
//! All gauges are recomputed from an index snapshot after every mutation, so
//! they never drift from the in-memory ledger. `leases_counts` is reset and
//! recounted each time: phases come and go, and a stale (namespace,
//! networkType, phase) series must drop to absent rather than freeze at its
//! last value.

use kube::Resource;
use prometheus::{IntGaugeVec, Opts, Registry};
use tracing::warn;

use crate::index::IndexState;

pub struct Metrics {
    registry: Registry,
    pool_memory_available: IntGaugeVec,
    pool_memory_total: IntGaugeVec,
    pool_cpus_available: IntGaugeVec,
    pool_cpus_total: IntGaugeVec,
    pool_networks_available: IntGaugeVec,
    leases_in_use: IntGaugeVec,
    leases_counts: IntGaugeVec,
}

fn gauge(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> IntGaugeVec {
    let gauge = IntGaugeVec::new(Opts::new(name, help), labels)
        .expect("gauge definition is static and valid");
    if let Err(e) = registry.register(Box::new(gauge.clone())) {
        warn!("failed to register {}: {}", name, e);
    }
    gauge
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let pool_labels = &["namespace", "pool"];
        Self {
            pool_memory_available: gauge(
                &registry,
                "pool_memory_available",
                "The amount of memory available in a pool",
                pool_labels,
            ),
            pool_memory_total: gauge(
                &registry,
                "pool_memory_total",
                "The total amount of memory of a pool",
                pool_labels,
            ),
            pool_cpus_available: gauge(
                &registry,
                "pool_cpus_available",
                "The amount of cpus available in a pool",
                pool_labels,
            ),
            pool_cpus_total: gauge(
                &registry,
                "pool_cpus_total",
                "The total amount of cpus of a pool",
                pool_labels,
            ),
            pool_networks_available: gauge(
                &registry,
                "pool_networks_available",
                "Number of currently available networks in a pool",
                pool_labels,
            ),
            leases_in_use: gauge(
                &registry,
                "leases_in_use",
                "Number of leases in use",
                pool_labels,
            ),
            leases_counts: gauge(
                &registry,
                "leases_counts",
                "Counts of active leases",
                &["namespace", "networkType", "phase"],
            ),
            registry,
        }
    }

    /// Registry for the metrics endpoint to expose.
    #[allow(dead_code)] // consumed by the metrics endpoint wiring
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Recomputes every gauge from the index snapshot.
    pub fn update(&self, state: &IndexState) {
        for (name, pool) in &state.pools {
            let namespace = pool.meta().namespace.as_deref().unwrap_or("default");
            let labels = &[namespace, name.as_str()];
            let status = pool.status.clone().unwrap_or_default();

            self.pool_memory_available
                .with_label_values(labels)
                .set(status.memory_available);
            self.pool_memory_total
                .with_label_values(labels)
                .set(pool.spec.memory);
            self.pool_cpus_available
                .with_label_values(labels)
                .set(status.vcpus_available);
            self.pool_cpus_total
                .with_label_values(labels)
                .set(pool.spec.vcpus);
            self.pool_networks_available
                .with_label_values(labels)
                .set(status.network_available);
            self.leases_in_use
                .with_label_values(labels)
                .set(status.lease_count);
        }

        self.leases_counts.reset();
        for lease in state.leases.values() {
            let namespace = lease.meta().namespace.as_deref().unwrap_or("default");
            self.leases_counts
                .with_label_values(&[
                    namespace,
                    lease.network_type().as_str(),
                    lease.phase().as_str(),
                ])
                .inc();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{lease_builder, test_pool};
    use crds::Phase;

    #[test]
    fn lease_counts_reset_between_updates() {
        let metrics = Metrics::new();
        let mut state = IndexState::default();
        state.upsert_pool(test_pool("pool-0", 48, 192, 2000));
        state.upsert_lease(lease_builder("l1").phase(Phase::Pending).build());

        metrics.update(&state);
        state.leases.clear();
        state.upsert_lease(lease_builder("l2").phase(Phase::Fulfilled).build());
        metrics.update(&state);

        let families = metrics.registry().gather();
        let counts = families
            .iter()
            .find(|f| f.get_name() == "leases_counts")
            .unwrap();
        let live: Vec<_> = counts
            .get_metric()
            .iter()
            .filter(|m| m.get_gauge().get_value() > 0.0)
            .collect();
        assert_eq!(live.len(), 1);
        assert!(live[0]
            .get_label()
            .iter()
            .any(|l| l.get_name() == "phase" && l.get_value() == "Fulfilled"));
    }
}
