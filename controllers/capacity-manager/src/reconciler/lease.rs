//! Lease reconciler.
//!
//! The core of the scheduler. A single reconcile, under the index lock:
//! handle deletion, initialize new leases, enforce fairness, bind at most
//! one additional pool, assign networks (shared boskos set first, then
//! fresh candidates per pool), derive phase and conditions, render env
//! vars, persist, and bump neighbours so waiters advance.

use std::collections::HashSet;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::Resource;
use tracing::{debug, info};

use crds::conditions::{
    set_condition, Condition, ConditionSeverity, ConditionType, REASON_LEASE_DELAYED,
    REASON_LEASE_PARTIAL, REASON_NO_AVAILABLE_POOL,
};
use crds::{
    FailureDomain, Lease, LeaseStatus, Network, NetworkType, Phase, Pool, BUILD_ID_ANNOTATION,
    DEFAULT_GS_BUCKET, DEFAULT_URL_PREFIX, GIT_ORG_ANNOTATION, GIT_PR_ANNOTATION,
    GIT_REPO_ANNOTATION, GS_BUCKET_ANNOTATION, JOB_NAME_ANNOTATION, JOB_TYPE_ANNOTATION,
    JOB_TYPE_PERIODIC, JOB_TYPE_PRESUBMIT, LAST_UPDATED_ANNOTATION, LEASE_FINALIZER,
    NETWORK_KIND, URL_PREFIX_ANNOTATION,
};

use crate::error::ControllerError;
use crate::index::IndexState;
use crate::{capacity, envvars, fit};

use super::Reconciler;

fn record_now() -> Time {
    Time(Utc::now())
}

enum PoolSelection {
    Chosen(Pool),
    NoneFit(String),
    NotNeeded,
}

impl Reconciler {
    pub async fn reconcile_lease(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ControllerError> {
        let key = format!("{}/{}", namespace, name);
        let result = self.reconcile_lease_inner(namespace, name, &key).await;
        match &result {
            Ok(()) => self.reset_error(&key),
            Err(_) => {
                self.increment_error(&key);
            }
        }
        result
    }

    async fn reconcile_lease_inner(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<(), ControllerError> {
        // Held across the whole reconcile, store I/O included: the capacity
        // decision and its persisted effects must be indivisible.
        let mut state = self.index.lock().await;

        let mut lease = match self.store.get_lease(namespace, name).await {
            Ok(lease) => lease,
            Err(e) if e.is_not_found() => {
                state.remove_lease(key);
                capacity::recompute(&mut state);
                self.metrics.update(&state);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if lease.is_terminating() {
            return self.release_lease(&mut state, lease).await;
        }

        if lease.status.is_none() {
            self.initialize_lease(&mut lease).await?;
        }
        state.upsert_lease(lease.clone());

        match lease.phase() {
            // Failed is terminal until the lease is recreated.
            Phase::Failed => return Ok(()),
            Phase::Fulfilled => {
                self.metrics.update(&state);
                return Ok(());
            }
            Phase::Pending | Phase::Partial => {}
        }

        // A required pool that is degraded can never be satisfied: the lease
        // would otherwise retry forever against a pool with no credentials.
        if !lease.spec.required_pool.is_empty() {
            let degraded = state
                .pools
                .get(&lease.spec.required_pool)
                .and_then(|p| p.status.as_ref())
                .is_some_and(|s| s.degraded);
            if degraded {
                return self.fail_lease(&mut state, lease).await;
            }
        }

        // The disconnected wire type is enumerated but never schedulable.
        // Rejected before any pool is bound, so no capacity sits reserved
        // behind a request that cannot complete.
        if lease.network_type() == NetworkType::Disconnected && lease.spec.networks > 0 {
            return self
                .report_no_pool(
                    &mut state,
                    lease,
                    "network type disconnected is not supported for scheduling".to_string(),
                )
                .await;
        }

        // Refresh the capacity ledger before deciding.
        let changed = capacity::recompute(&mut state);
        for pool in &changed {
            self.store.update_pool_status(pool).await?;
        }

        let previous_phase = lease.phase();
        let pools_wanted = lease.spec.pool_count();
        let bound = lease.pool_refs().len() as i64;

        let selection = if bound < pools_wanted {
            let pools: Vec<&Pool> = state.pools.values().collect();
            let (candidates, decisions) = fit::fitting_pools(&lease, &pools);
            match fit::choose(&candidates, self.config.strategy) {
                Some(pool) => PoolSelection::Chosen((*pool).clone()),
                None => PoolSelection::NoneFit(fit::format_decisions(&decisions)),
            }
        } else {
            PoolSelection::NotNeeded
        };

        match selection {
            PoolSelection::Chosen(pool) => {
                // Fairness applies only while the lease holds nothing: a
                // lease mid-assignment finishes ahead of the queue.
                if bound == 0 && lease.network_refs().is_empty() {
                    if let Some(blocker) = should_delay(&state, &lease) {
                        return self.delay_lease(&mut state, lease, key, blocker).await;
                    }
                }
                let pool_name = pool.meta().name.clone().unwrap_or_default();
                lease
                    .meta_mut()
                    .owner_references
                    .get_or_insert_with(Vec::new)
                    .push(pool.owner_reference());
                info!("lease {} bound to pool {}", key, pool_name);
            }
            PoolSelection::NoneFit(message) if bound == 0 => {
                return self.report_no_pool(&mut state, lease, message).await;
            }
            PoolSelection::NoneFit(message) => {
                // Partially bound; keep what we have and report counts below.
                debug!("lease {} found no additional pool: {}", key, message);
            }
            PoolSelection::NotNeeded => {}
        }

        let assignments = self.ensure_networks(&state, &mut lease);

        let pools_held = lease.pool_refs().len() as i64;
        let networks_held = lease.network_refs().len() as i64;
        let networks_wanted = lease.spec.network_quota();
        let now = record_now();

        let mut status = lease.status.take().unwrap_or_default();
        if pools_held >= pools_wanted && networks_held >= networks_wanted {
            status.phase = Phase::Fulfilled;
            set_condition(
                &mut status.conditions,
                Condition::true_condition(ConditionType::Fulfilled),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_condition(ConditionType::Pending),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_condition(ConditionType::Partial),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_condition(ConditionType::Delayed),
                now.clone(),
            );
        } else if pools_held > 0 || networks_held > 0 {
            status.phase = Phase::Partial;
            let message = format!(
                "assigned {} of {} pools, {} of {} networks",
                pools_held, pools_wanted, networks_held, networks_wanted
            );
            set_condition(
                &mut status.conditions,
                Condition::true_with_reason(
                    ConditionType::Partial,
                    REASON_LEASE_PARTIAL,
                    message.clone(),
                ),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_with_reason(
                    ConditionType::Fulfilled,
                    REASON_LEASE_PARTIAL,
                    ConditionSeverity::Info,
                    message,
                ),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_condition(ConditionType::Pending),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_condition(ConditionType::Delayed),
                now.clone(),
            );
        } else {
            status.phase = Phase::Pending;
            set_condition(
                &mut status.conditions,
                Condition::true_condition(ConditionType::Pending),
                now.clone(),
            );
            set_condition(
                &mut status.conditions,
                Condition::false_condition(ConditionType::Delayed),
                now.clone(),
            );
        }

        // Allocation result: one failure domain per pool, env vars per pool.
        if !assignments.is_empty() {
            status.pool_info = assignments
                .iter()
                .map(|(pool, networks)| pool_failure_domain(pool, networks))
                .collect();
            status.failure_domain = status.pool_info.first().cloned();
            for (pool, networks) in &assignments {
                if let Some(network) = networks.first() {
                    let rendered = envvars::render_env_vars(pool, network);
                    status.env_vars = rendered.clone();
                    status
                        .env_vars_map
                        .insert(pool.meta().name.clone().unwrap_or_default(), rendered);
                }
            }
        }
        lease.status = Some(status);

        // Main record first (owner references, finalizers), status second.
        self.store.update_lease(&lease).await?;
        self.store.update_lease_status(&lease).await?;
        state.upsert_lease(lease.clone());

        let changed = capacity::recompute(&mut state);
        for pool in &changed {
            self.store.update_pool_status(pool).await?;
        }

        if previous_phase != Phase::Fulfilled && lease.phase() == Phase::Fulfilled {
            info!("lease {} fulfilled", key);
            self.bump_pools(&mut state).await?;
            self.bump_oldest_waiter(&mut state, lease.network_type(), Some(key))
                .await?;
        }
        self.metrics.update(&state);
        Ok(())
    }

    /// First reconcile: finalizer, placeholder status, job link.
    async fn initialize_lease(&self, lease: &mut Lease) -> Result<(), ControllerError> {
        let now = record_now();
        let finalizers = lease.meta_mut().finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == LEASE_FINALIZER) {
            finalizers.push(LEASE_FINALIZER.to_string());
        }
        *lease = self.store.update_lease(lease).await?;

        let mut status = LeaseStatus {
            phase: Phase::Pending,
            job_link: job_link_for(lease).unwrap_or_default(),
            failure_domain: Some(placeholder_domain()),
            ..Default::default()
        };
        set_condition(
            &mut status.conditions,
            Condition::true_condition(ConditionType::Pending),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::false_condition(ConditionType::Fulfilled),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::false_condition(ConditionType::Delayed),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::false_condition(ConditionType::Partial),
            now,
        );
        lease.status = Some(status);
        *lease = self.store.update_lease_status(lease).await?;
        info!("lease {} initialized", lease.key());
        Ok(())
    }

    /// Deletion path: drop our finalizer (foreign ones stay), release all
    /// derived state, and wake whoever was waiting on this capacity.
    async fn release_lease(
        &self,
        state: &mut IndexState,
        mut lease: Lease,
    ) -> Result<(), ControllerError> {
        let key = lease.key();
        let network_type = lease.network_type();
        if let Some(finalizers) = lease.meta_mut().finalizers.as_mut() {
            finalizers.retain(|f| f != LEASE_FINALIZER);
        }
        self.store.update_lease(&lease).await?;
        state.remove_lease(&key);

        let changed = capacity::recompute(state);
        for pool in &changed {
            self.store.update_pool_status(pool).await?;
        }
        self.bump_pools(state).await?;
        self.bump_oldest_waiter(state, network_type, None).await?;
        self.metrics.update(state);
        info!("lease {} released", key);
        Ok(())
    }

    /// Terminal bad input: required pool exists but is degraded.
    async fn fail_lease(
        &self,
        state: &mut IndexState,
        mut lease: Lease,
    ) -> Result<(), ControllerError> {
        let now = record_now();
        let mut status = lease.status.take().unwrap_or_default();
        status.phase = Phase::Failed;
        set_condition(
            &mut status.conditions,
            Condition::false_with_reason(
                ConditionType::Fulfilled,
                REASON_NO_AVAILABLE_POOL,
                ConditionSeverity::Error,
                format!("required pool {} is degraded", lease.spec.required_pool),
            ),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::false_condition(ConditionType::Pending),
            now,
        );
        lease.status = Some(status);
        self.store.update_lease_status(&lease).await?;
        info!("lease {} failed: required pool degraded", lease.key());
        state.upsert_lease(lease);
        self.metrics.update(state);
        Ok(())
    }

    /// Fairness wait state: record it and wake the head of the queue.
    async fn delay_lease(
        &self,
        state: &mut IndexState,
        mut lease: Lease,
        key: &str,
        blocker: String,
    ) -> Result<(), ControllerError> {
        let now = record_now();
        let mut status = lease.status.take().unwrap_or_default();
        status.phase = Phase::Pending;
        set_condition(
            &mut status.conditions,
            Condition::true_with_reason(
                ConditionType::Delayed,
                REASON_LEASE_DELAYED,
                format!("waiting behind lease {}", blocker),
            ),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::false_with_reason(
                ConditionType::Fulfilled,
                REASON_LEASE_DELAYED,
                ConditionSeverity::Info,
                format!("waiting behind lease {}", blocker),
            ),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::true_condition(ConditionType::Pending),
            now,
        );
        lease.status = Some(status);
        self.store.update_lease_status(&lease).await?;
        state.upsert_lease(lease.clone());
        self.bump_oldest_waiter(state, lease.network_type(), Some(key))
            .await?;
        self.metrics.update(state);
        Err(ControllerError::LeaseDelayed(blocker))
    }

    /// Nothing schedulable for this lease right now: record why and retry
    /// later. A future release bumps this lease awake.
    async fn report_no_pool(
        &self,
        state: &mut IndexState,
        mut lease: Lease,
        message: String,
    ) -> Result<(), ControllerError> {
        let now = record_now();
        let mut status = lease.status.take().unwrap_or_default();
        status.phase = Phase::Pending;
        set_condition(
            &mut status.conditions,
            Condition::false_with_reason(
                ConditionType::Fulfilled,
                REASON_NO_AVAILABLE_POOL,
                ConditionSeverity::Warning,
                message.clone(),
            ),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::true_condition(ConditionType::Pending),
            now.clone(),
        );
        set_condition(
            &mut status.conditions,
            Condition::false_condition(ConditionType::Delayed),
            now,
        );
        lease.status = Some(status);
        self.store.update_lease_status(&lease).await?;
        state.upsert_lease(lease);
        self.metrics.update(state);
        Err(ControllerError::NoAvailablePool(message))
    }

    /// Ensures every bound pool carries its quota of networks. Existing
    /// references are attributed to pools first, then the shared boskos set
    /// is adopted, then fresh candidates fill the remainder one at a time.
    fn ensure_networks(
        &self,
        state: &IndexState,
        lease: &mut Lease,
    ) -> Vec<(Pool, Vec<Network>)> {
        let per_pool = lease.spec.networks;
        let mut assignments: Vec<(Pool, Vec<Network>)> = lease
            .pool_refs()
            .iter()
            .filter_map(|r| state.pools.get(&r.name).cloned())
            .map(|pool| (pool, Vec::new()))
            .collect();
        if per_pool <= 0 || assignments.is_empty() {
            return assignments;
        }

        let mut held_segments: HashSet<(String, String)> = lease
            .network_refs()
            .iter()
            .filter_map(|r| state.networks.get(&r.name))
            .map(Network::segment_key)
            .collect();

        let existing: Vec<Network> = lease
            .network_refs()
            .iter()
            .filter_map(|r| state.networks.get(&r.name).cloned())
            .collect();
        for network in existing {
            place_network(&mut assignments, network, per_pool);
        }

        // Shared path: a peer lease with the same boskos identity and real
        // compute donates its networks, so one job spanning vCenters lands
        // on one set of segments. Network-only leases never share.
        if lease.spec.has_compute() {
            if let Some(peer_networks) = shared_networks(state, lease) {
                for network in peer_networks {
                    if lease.network_refs().len() as i64 >= lease.spec.network_quota() {
                        break;
                    }
                    let name = network.meta().name.clone().unwrap_or_default();
                    if lease.owns(NETWORK_KIND, &name)
                        || held_segments.contains(&network.segment_key())
                    {
                        continue;
                    }
                    lease
                        .meta_mut()
                        .owner_references
                        .get_or_insert_with(Vec::new)
                        .push(network.owner_reference());
                    held_segments.insert(network.segment_key());
                    debug!("lease {} adopted shared network {}", lease.key(), name);
                    place_network(&mut assignments, network, per_pool);
                }
            }
        }

        // Fresh path, one network at a time per pool until the quota is met
        // or candidates run out.
        for slot in 0..assignments.len() {
            while (assignments[slot].1.len() as i64) < per_pool {
                let candidate =
                    self.next_candidate(state, lease, &assignments[slot].0, &held_segments);
                let Some(network) = candidate else {
                    break;
                };
                lease
                    .meta_mut()
                    .owner_references
                    .get_or_insert_with(Vec::new)
                    .push(network.owner_reference());
                held_segments.insert(network.segment_key());
                assignments[slot].1.push(network);
            }
        }

        assignments
    }

    /// First free network of the requested type reachable from the pool.
    /// Falls back to single-tenant candidates for multi-tenant leases when
    /// the feature flag allows it.
    fn next_candidate(
        &self,
        state: &IndexState,
        lease: &Lease,
        pool: &Pool,
        held_segments: &HashSet<(String, String)>,
    ) -> Option<Network> {
        let wanted = lease.network_type();
        if wanted == NetworkType::Disconnected {
            // Enumerated but unsupported in scheduling.
            return None;
        }

        let pick = |network_type: NetworkType| -> Option<Network> {
            state
                .networks
                .values()
                .find(|network| {
                    network.meta().deletion_timestamp.is_none()
                        && pool_reaches_network(pool, network)
                        && network.spec.network_type.normalized() == network_type
                        && !held_segments.contains(&network.segment_key())
                        && !lease.owns(
                            NETWORK_KIND,
                            network.meta().name.as_deref().unwrap_or_default(),
                        )
                        && self.network_free_for(state, lease, network)
                })
                .cloned()
        };

        pick(wanted).or_else(|| {
            if wanted == NetworkType::MultiTenant && self.config.allow_multi_tenant_fallback {
                pick(NetworkType::SingleTenant)
            } else {
                None
            }
        })
    }

    /// Conflict rule: shareable networks are always free; exclusive ones
    /// must have no other non-terminating owner.
    fn network_free_for(&self, state: &IndexState, lease: &Lease, network: &Network) -> bool {
        if network.spec.network_type.shareable() {
            return true;
        }
        let name = network.meta().name.as_deref().unwrap_or_default();
        state
            .network_owners(name)
            .iter()
            .all(|owner| owner.key() == lease.key())
    }

    /// Writes the last-updated annotation on every pool so their
    /// reconcilers recompute capacity off the watch stream.
    async fn bump_pools(&self, state: &mut IndexState) -> Result<(), ControllerError> {
        let stamp = Utc::now().to_rfc3339();
        let names: Vec<String> = state.pools.keys().cloned().collect();
        for name in names {
            let Some(mut pool) = state.pools.get(&name).cloned() else {
                continue;
            };
            pool.meta_mut()
                .annotations
                .get_or_insert_with(Default::default)
                .insert(LAST_UPDATED_ANNOTATION.to_string(), stamp.clone());
            let updated = self.store.update_pool(&pool).await?;
            state.upsert_pool(updated);
        }
        Ok(())
    }

    /// Wakes the oldest still-unfulfilled lease of the given network type.
    async fn bump_oldest_waiter(
        &self,
        state: &mut IndexState,
        network_type: NetworkType,
        exclude_key: Option<&str>,
    ) -> Result<(), ControllerError> {
        let Some(waiter) = state.oldest_unfulfilled(network_type, exclude_key).cloned() else {
            return Ok(());
        };
        let mut waiter = waiter;
        waiter
            .meta_mut()
            .annotations
            .get_or_insert_with(Default::default)
            .insert(LAST_UPDATED_ANNOTATION.to_string(), Utc::now().to_rfc3339());
        debug!("bumping waiter {}", waiter.key());
        let updated = self.store.update_lease(&waiter).await?;
        state.upsert_lease(updated);
        Ok(())
    }
}

/// Attributes a network to a bound pool: the first pool with quota room
/// whose topology reaches it, else any pool with room (shared networks may
/// live in another vCenter entirely).
fn place_network(assignments: &mut [(Pool, Vec<Network>)], network: Network, per_pool: i64) {
    let reachable = assignments.iter_mut().position(|(pool, networks)| {
        (networks.len() as i64) < per_pool && pool_reaches_network(pool, &network)
    });
    let slot = reachable.or_else(|| {
        assignments
            .iter()
            .position(|(_, networks)| (networks.len() as i64) < per_pool)
    });
    if let Some(slot) = slot {
        assignments[slot].1.push(network);
    }
}

/// Membership rule: the network's pod matches the pool's pod and a topology
/// entry names the network's port-group.
fn pool_reaches_network(pool: &Pool, network: &Network) -> bool {
    network.spec.pod_name == pool.spec.physical_datacenter.pod
        && pool
            .spec
            .failure_domain
            .topology
            .networks
            .iter()
            .any(|entry| entry.contains(network.spec.port_group_name.as_str()))
}

/// Donor networks for the shared boskos path: any non-failed, non-terminating
/// peer with the same identity, real compute, and network references.
fn shared_networks(state: &IndexState, lease: &Lease) -> Option<Vec<Network>> {
    let id = lease.boskos_id()?;
    let peer = state.leases.values().find(|other| {
        other.key() != lease.key()
            && !other.is_terminating()
            && other.phase() != Phase::Failed
            && other.spec.has_compute()
            && other.boskos_id() == Some(id)
            && !other.network_refs().is_empty()
    })?;
    Some(
        peer.network_refs()
            .iter()
            .filter_map(|r| state.networks.get(&r.name).cloned())
            .collect(),
    )
}

/// Head-of-line rule: scan all in-memory leases of the same network type
/// and yield the key of the lease this one must wait behind, if any.
fn should_delay(state: &IndexState, lease: &Lease) -> Option<String> {
    let my_created = lease.meta().creation_timestamp.clone();
    let my_key = lease.key();
    for (key, other) in &state.leases {
        if *key == my_key
            || other.is_terminating()
            || other.network_type() != lease.network_type()
        {
            continue;
        }
        match other.phase() {
            Phase::Fulfilled | Phase::Failed => continue,
            Phase::Partial => {
                // A partially satisfied lease targeting our pool (empty
                // matches any) finishes first.
                if lease.spec.required_pool.is_empty()
                    || lease.spec.required_pool == other.spec.required_pool
                {
                    return Some(key.clone());
                }
            }
            Phase::Pending => {
                let overlap = other.spec.required_pool == lease.spec.required_pool
                    || other.spec.required_pool.is_empty()
                    || lease.spec.required_pool.is_empty();
                if overlap && other.meta().creation_timestamp < my_created {
                    return Some(key.clone());
                }
            }
        }
    }
    None
}

/// Failure domain entry for status.poolInfo: the pool's domain, named after
/// the pool, carrying only the topology entries of its assigned networks.
fn pool_failure_domain(pool: &Pool, networks: &[Network]) -> FailureDomain {
    let mut domain = pool.spec.failure_domain.clone();
    domain.name = pool.meta().name.clone().unwrap_or_default();
    domain.topology.networks = networks
        .iter()
        .map(|network| {
            pool.spec
                .failure_domain
                .topology
                .networks
                .iter()
                .find(|entry| entry.contains(network.spec.port_group_name.as_str()))
                .cloned()
                .unwrap_or_else(|| network.spec.port_group_name.clone())
        })
        .collect();
    domain
}

/// Placeholder topology written at initialization, before any assignment.
fn placeholder_domain() -> FailureDomain {
    FailureDomain {
        name: "pending".to_string(),
        server: "pending".to_string(),
        region: "pending".to_string(),
        zone: "pending".to_string(),
        ..Default::default()
    }
}

/// Job-link URL from the prow annotations. Periodic and presubmit jobs use
/// different GCS layouts; anything else gets no link.
fn job_link_for(lease: &Lease) -> Option<String> {
    let annotations = lease.meta().annotations.as_ref()?;
    let job_type = annotations.get(JOB_TYPE_ANNOTATION)?;
    let job = annotations.get(JOB_NAME_ANNOTATION)?;
    let build_id = annotations.get(BUILD_ID_ANNOTATION)?;
    let prefix = annotations
        .get(URL_PREFIX_ANNOTATION)
        .map(String::as_str)
        .unwrap_or(DEFAULT_URL_PREFIX);
    let bucket = annotations
        .get(GS_BUCKET_ANNOTATION)
        .map(String::as_str)
        .unwrap_or(DEFAULT_GS_BUCKET);

    match job_type.as_str() {
        JOB_TYPE_PERIODIC => Some(format!("{prefix}gs/{bucket}/logs/{job}/{build_id}")),
        JOB_TYPE_PRESUBMIT => {
            let org = annotations.get(GIT_ORG_ANNOTATION)?;
            let repo = annotations.get(GIT_REPO_ANNOTATION)?;
            let pr = annotations.get(GIT_PR_ANNOTATION)?;
            Some(format!(
                "{prefix}gs/{bucket}/pr-logs/pull/{org}_{repo}/{pr}/{job}/{build_id}"
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::lease_builder;

    #[test]
    fn periodic_job_link_uses_logs_layout() {
        let lease = lease_builder("l1")
            .annotation(JOB_TYPE_ANNOTATION, "periodic")
            .annotation(JOB_NAME_ANNOTATION, "periodic-ci-vsphere-e2e")
            .annotation(BUILD_ID_ANNOTATION, "18123456789")
            .build();
        assert_eq!(
            job_link_for(&lease).unwrap(),
            "https://prow.ci.openshift.org/view/gs/test-platform-results/logs/periodic-ci-vsphere-e2e/18123456789"
        );
    }

    #[test]
    fn presubmit_job_link_uses_pr_logs_layout() {
        let lease = lease_builder("l1")
            .annotation(JOB_TYPE_ANNOTATION, "presubmit")
            .annotation(JOB_NAME_ANNOTATION, "pull-ci-installer-e2e")
            .annotation(BUILD_ID_ANNOTATION, "42")
            .annotation(GIT_ORG_ANNOTATION, "openshift")
            .annotation(GIT_REPO_ANNOTATION, "installer")
            .annotation(GIT_PR_ANNOTATION, "9001")
            .build();
        assert_eq!(
            job_link_for(&lease).unwrap(),
            "https://prow.ci.openshift.org/view/gs/test-platform-results/pr-logs/pull/openshift_installer/9001/pull-ci-installer-e2e/42"
        );
    }

    #[test]
    fn custom_prefix_and_bucket_override_defaults() {
        let lease = lease_builder("l1")
            .annotation(JOB_TYPE_ANNOTATION, "periodic")
            .annotation(JOB_NAME_ANNOTATION, "job")
            .annotation(BUILD_ID_ANNOTATION, "1")
            .annotation(URL_PREFIX_ANNOTATION, "https://deck.example.com/view/")
            .annotation(GS_BUCKET_ANNOTATION, "private-results")
            .build();
        assert_eq!(
            job_link_for(&lease).unwrap(),
            "https://deck.example.com/view/gs/private-results/logs/job/1"
        );
    }

    #[test]
    fn unknown_job_type_yields_no_link() {
        let lease = lease_builder("l1")
            .annotation(JOB_TYPE_ANNOTATION, "postsubmit")
            .annotation(JOB_NAME_ANNOTATION, "job")
            .annotation(BUILD_ID_ANNOTATION, "1")
            .build();
        assert!(job_link_for(&lease).is_none());
    }
}
