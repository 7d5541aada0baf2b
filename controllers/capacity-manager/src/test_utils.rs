//! Test fixtures and builders for reconciler tests.
//!
//! The default fixture mirrors a small CI fleet: four pools of descending
//! size, each in its own pod with five single-tenant port-groups, twenty
//! networks total. Lease shapes follow the CI convention: small is
//! 16 vCPU / 16 GiB / 120 GiB with one network, medium is ten times that
//! compute.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::ObjectMeta;
use kube::Resource;

use crds::{
    FailureDomain, Lease, LeaseSpec, Network, NetworkSpec, NetworkType, Phase, PhysicalDatacenter,
    Pool, PoolSpec, Toleration, Topology, BOSKOS_LEASE_ID_LABEL,
};
use record_store::{MockStore, RecordStore};

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, SchedulerConfig};
use crate::subnets::SubnetCatalog;

pub fn test_pool(name: &str, vcpus: i64, memory: i64, storage: i64) -> Pool {
    pool_with_networks(
        name,
        vcpus,
        memory,
        storage,
        "pod-0",
        &["ci-vlan-00", "ci-vlan-01", "ci-vlan-02", "ci-vlan-03", "ci-vlan-04"],
    )
}

pub fn pool_with_networks(
    name: &str,
    vcpus: i64,
    memory: i64,
    storage: i64,
    pod: &str,
    port_groups: &[&str],
) -> Pool {
    Pool {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            uid: Some(format!("uid-pool-{name}")),
            ..Default::default()
        },
        spec: PoolSpec {
            vcpus,
            memory,
            storage,
            over_commit_ratio: 1.0,
            failure_domain: FailureDomain {
                name: name.to_string(),
                server: format!("vcenter-{name}.ci.example.com"),
                region: "us-east".to_string(),
                zone: format!("{name}-zone"),
                short_name: String::new(),
                topology: Topology {
                    datacenter: "cidatacenter".to_string(),
                    compute_cluster: format!("/cidatacenter/host/{name}"),
                    datastore: format!("/cidatacenter/datastore/{name}"),
                    resource_pool: format!("/cidatacenter/host/{name}/Resources/ci"),
                    networks: port_groups
                        .iter()
                        .map(|pg| format!("/dal10/host/{pg}"))
                        .collect(),
                },
            },
            physical_datacenter: PhysicalDatacenter {
                datacenter: "dal10".to_string(),
                pod: pod.to_string(),
            },
            exclude: false,
            no_schedule: false,
            taints: Vec::new(),
        },
        status: None,
    }
}

pub fn test_network(name: &str, vlan: &str, network_type: NetworkType) -> Network {
    network_in_pod(name, vlan, "pod-0", network_type)
}

pub fn network_in_pod(name: &str, vlan: &str, pod: &str, network_type: NetworkType) -> Network {
    Network {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            uid: Some(format!("uid-net-{name}")),
            ..Default::default()
        },
        spec: NetworkSpec {
            port_group_name: name.to_string(),
            vlan_id: vlan.to_string(),
            datacenter_name: "dal10".to_string(),
            pod_name: pod.to_string(),
            primary_router_hostname: format!("bcr01a.{pod}"),
            cidrs: vec!["192.168.96.0/25".to_string()],
            gateway: Some("192.168.96.1".to_string()),
            nameservers: vec!["192.168.96.2".to_string()],
            ip_range: None,
            network_type,
        },
    }
}

/// Four pools of descending size, one pod each, five port-groups per pod.
pub fn default_fixture_pools() -> Vec<Pool> {
    let shapes: [(i64, i64, i64); 4] = [
        (120, 1600, 10000),
        (120, 1600, 10000),
        (60, 800, 5000),
        (40, 600, 1000),
    ];
    shapes
        .iter()
        .enumerate()
        .map(|(i, (vcpus, memory, storage))| {
            let port_groups: Vec<String> =
                (i * 5..i * 5 + 5).map(|n| format!("ci-vlan-{n:02}")).collect();
            let refs: Vec<&str> = port_groups.iter().map(String::as_str).collect();
            pool_with_networks(
                &format!("pool-{i}"),
                *vcpus,
                *memory,
                *storage,
                &format!("pod-{i}"),
                &refs,
            )
        })
        .collect()
}

/// Twenty single-tenant networks, five per pod.
pub fn default_fixture_networks() -> Vec<Network> {
    (0..20)
        .map(|n| {
            network_in_pod(
                &format!("ci-vlan-{n:02}"),
                &format!("{}", 1100 + n),
                &format!("pod-{}", n / 5),
                NetworkType::SingleTenant,
            )
        })
        .collect()
}

pub struct LeaseBuilder {
    lease: Lease,
}

pub fn lease_builder(name: &str) -> LeaseBuilder {
    LeaseBuilder {
        lease: Lease {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: LeaseSpec::default(),
            status: None,
        },
    }
}

impl LeaseBuilder {
    pub fn resources(mut self, vcpus: i64, memory: i64, storage: i64) -> Self {
        self.lease.spec.vcpus = vcpus;
        self.lease.spec.memory = memory;
        self.lease.spec.storage = storage;
        self
    }

    /// 16 vCPU / 16 GiB / 120 GiB, one network.
    pub fn shape_small(self) -> Self {
        self.resources(16, 16, 120).networks(1)
    }

    /// 160 vCPU / 160 GiB / 1200 GiB, one network.
    pub fn shape_medium(self) -> Self {
        self.resources(160, 160, 1200).networks(1)
    }

    pub fn networks(mut self, count: i64) -> Self {
        self.lease.spec.networks = count;
        self
    }

    pub fn pools(mut self, count: i64) -> Self {
        self.lease.spec.pools = count;
        self
    }

    pub fn required_pool(mut self, name: &str) -> Self {
        self.lease.spec.required_pool = name.to_string();
        self
    }

    pub fn pool_selector(mut self, key: &str, value: &str) -> Self {
        self.lease
            .spec
            .pool_selector
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn toleration(mut self, toleration: Toleration) -> Self {
        self.lease.spec.tolerations.push(toleration);
        self
    }

    pub fn network_type(mut self, network_type: NetworkType) -> Self {
        self.lease.spec.network_type = network_type;
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.lease
            .metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn boskos_id(self, id: &str) -> Self {
        self.label(BOSKOS_LEASE_ID_LABEL, id)
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.lease
            .metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.lease
            .status
            .get_or_insert_with(Default::default)
            .phase = phase;
        self
    }

    pub fn created_at(mut self, secs: i64) -> Self {
        self.lease.metadata.creation_timestamp =
            Some(Time(Utc.timestamp_opt(secs, 0).unwrap()));
        self
    }

    pub fn owned_by_pool(mut self, pool: &Pool) -> Self {
        self.lease
            .metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(pool.owner_reference());
        self
    }

    pub fn owned_by_network(mut self, network: &Network) -> Self {
        self.lease
            .metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(network.owner_reference());
        self
    }

    pub fn build(self) -> Lease {
        self.lease
    }
}

/// A reconciler wired to a mock store with a fixture loaded, plus a settle
/// loop that drives reconciles the way the watch stream would.
pub struct TestHarness {
    pub store: MockStore,
    pub reconciler: Reconciler,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_fixture(
            default_fixture_pools(),
            default_fixture_networks(),
            SchedulerConfig::default(),
        )
        .await
    }

    pub async fn with_fixture(
        pools: Vec<Pool>,
        networks: Vec<Network>,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_catalog(pools, networks, SubnetCatalog::default(), config).await
    }

    pub async fn with_catalog(
        pools: Vec<Pool>,
        networks: Vec<Network>,
        catalog: SubnetCatalog,
        config: SchedulerConfig,
    ) -> Self {
        let store = MockStore::new();
        for pool in pools {
            store.add_pool(pool);
        }
        for network in networks {
            store.add_network(network);
        }
        let reconciler = Reconciler::new(Arc::new(store.clone()), catalog, config);
        let harness = Self { store, reconciler };
        harness.sync_pools_and_networks().await;
        harness
    }

    /// Registers every pool and network the way their watchers would.
    pub async fn sync_pools_and_networks(&self) {
        for pool in self.store.list_pools().await.unwrap() {
            let namespace = pool.meta().namespace.clone().unwrap();
            let name = pool.meta().name.clone().unwrap();
            self.reconciler
                .reconcile_pool(&namespace, &name)
                .await
                .unwrap();
        }
        for network in self.store.list_networks().await.unwrap() {
            let namespace = network.meta().namespace.clone().unwrap();
            let name = network.meta().name.clone().unwrap();
            self.reconciler
                .reconcile_network(&namespace, &name)
                .await
                .unwrap();
        }
    }

    pub fn create_lease(&self, lease: Lease) -> Lease {
        self.store.add_lease(lease)
    }

    pub async fn reconcile(&self, name: &str) -> Result<(), ControllerError> {
        self.reconciler.reconcile_lease("default", name).await
    }

    /// Mirrors watch delivery: every stored lease becomes visible to the
    /// index (fairness scans it) without being reconciled, and entries gone
    /// from the store are dropped.
    pub async fn observe_leases(&self) {
        let leases = self.store.list_leases().await.unwrap();
        self.reconciler
            .index
            .with_lock(|state| {
                let live: std::collections::BTreeSet<String> =
                    leases.iter().map(Lease::key).collect();
                state.leases.retain(|key, _| live.contains(key));
                for lease in leases {
                    state.upsert_lease(lease);
                }
            })
            .await;
    }

    /// Reconciles every lease in key order until nothing changes. Errors are
    /// requeues in production; here they just mean "try again next round".
    pub async fn settle(&self) {
        for _ in 0..12 {
            let before = self.snapshot().await;
            self.observe_leases().await;
            for lease in self.store.list_leases().await.unwrap() {
                let namespace = lease.meta().namespace.clone().unwrap();
                let name = lease.meta().name.clone().unwrap();
                let _ = self.reconciler.reconcile_lease(&namespace, &name).await;
            }
            if self.snapshot().await == before {
                break;
            }
        }
    }

    /// Stable digest of phases, owner references, and pool capacity; bump
    /// annotations are deliberately excluded.
    async fn snapshot(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for lease in self.store.list_leases().await.unwrap() {
            let refs: Vec<String> = lease
                .meta()
                .owner_references
                .iter()
                .flatten()
                .map(|r| r.name.clone())
                .collect();
            parts.push(format!(
                "{}={}:{:?}",
                lease.key(),
                lease.phase().as_str(),
                refs
            ));
        }
        for pool in self.store.list_pools().await.unwrap() {
            let status = pool.status.clone().unwrap_or_default();
            parts.push(format!(
                "{}={}:{}:{}:{}",
                pool.meta().name.clone().unwrap_or_default(),
                status.vcpus_available,
                status.memory_available,
                status.network_available,
                status.lease_count
            ));
        }
        parts.join("|")
    }

    pub async fn lease(&self, name: &str) -> Lease {
        self.store.get_lease("default", name).await.unwrap()
    }

    pub async fn pool(&self, name: &str) -> Pool {
        self.store.get_pool("default", name).await.unwrap()
    }
}
