//! Pool capacity calculator.
//!
//! Pure derivation of every pool's remaining capacity from the current lease
//! map. All non-terminating leases with an owner reference to a pool reserve
//! their full demand there, whatever their phase: a Partial or Pending lease
//! that already grabbed a pool must not have its capacity double-booked away
//! before it finishes.
//!
//! The over-commit ratio applies to vCPUs only. Network availability is
//! derived per (physical datacenter, pod): a port-group claimed by any lease
//! anchored in that pod is unavailable to every pool in it.

use std::collections::{BTreeMap, HashMap, HashSet};

use crds::{Pool, PoolStatus};

use crate::index::IndexState;

/// Recomputes the status of every pool in the index from the lease map.
/// Returns clones of the pools whose status changed, for persistence.
pub fn recompute(state: &mut IndexState) -> Vec<Pool> {
    let claims = claimed_port_groups(state);

    let mut updates: BTreeMap<String, PoolStatus> = BTreeMap::new();
    for (name, pool) in &state.pools {
        let mut status = pool.status.clone().unwrap_or_default();

        let mut vcpus = 0;
        let mut memory = 0;
        let mut storage = 0;
        let mut lease_count = 0;
        for lease in state.accepted_leases(name) {
            vcpus += lease.spec.vcpus;
            memory += lease.spec.memory;
            storage += lease.spec.storage;
            lease_count += 1;
        }

        status.vcpus_available = pool.spec.effective_vcpus() - vcpus;
        status.memory_available = pool.spec.memory - memory;
        status.storage_available = pool.spec.storage - storage;
        status.lease_count = lease_count;

        let pod_key = (
            pool.spec.physical_datacenter.datacenter.clone(),
            pool.spec.physical_datacenter.pod.clone(),
        );
        let claimed = claims.get(&pod_key);
        // The pool's port-groups are its topology entries plus whatever the
        // subnet catalog granted it, minus duplicates of the same segment.
        let mut entries: Vec<&str> = pool
            .spec
            .failure_domain
            .topology
            .networks
            .iter()
            .map(String::as_str)
            .collect();
        if let Some(cataloged) = state.pool_subnets.get(name) {
            for port_group in cataloged {
                if !entries.iter().any(|e| e.contains(port_group.as_str())) {
                    entries.push(port_group);
                }
            }
        }
        status.network_available = entries
            .iter()
            .filter(|entry| {
                claimed.map_or(true, |set| !set.iter().any(|pg| entry.contains(pg.as_str())))
            })
            .count() as i64;

        updates.insert(name.clone(), status);
    }

    let mut changed = Vec::new();
    for (name, status) in updates {
        let pool = state
            .pools
            .get_mut(&name)
            .expect("pool disappeared during recompute");
        if !same_capacity(pool.status.as_ref(), &status) {
            pool.status = Some(status);
            changed.push(pool.clone());
        }
    }
    changed
}

/// Port-groups claimed by any non-terminating lease, grouped by the
/// (physical datacenter, pod) of the claimed network.
fn claimed_port_groups(state: &IndexState) -> HashMap<(String, String), HashSet<String>> {
    let mut claims: HashMap<(String, String), HashSet<String>> = HashMap::new();
    for lease in state.leases.values() {
        if lease.is_terminating() {
            continue;
        }
        for net_ref in lease.network_refs() {
            let Some(network) = state.networks.get(&net_ref.name) else {
                continue;
            };
            claims
                .entry((
                    network.spec.datacenter_name.clone(),
                    network.spec.pod_name.clone(),
                ))
                .or_default()
                .insert(network.spec.port_group_name.clone());
        }
    }
    claims
}

fn same_capacity(previous: Option<&PoolStatus>, next: &PoolStatus) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    previous.vcpus_available == next.vcpus_available
        && previous.memory_available == next.memory_available
        && previous.storage_available == next.storage_available
        && previous.network_available == next.network_available
        && previous.lease_count == next.lease_count
}
