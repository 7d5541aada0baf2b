//! Pool CRD
//!
//! A Pool is a named slice of a vSphere cluster: total compute capacity, the
//! failure domain it lives in, and the port-groups reachable from it. Pool
//! status is derived state; the controllers recompute it from the leases that
//! hold owner references to the pool.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::CustomResource;
use kube::Resource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const POOL_KIND: &str = "Pool";

/// Finalizer keeping a pool visible until controller cleanup is observed.
pub const POOL_FINALIZER: &str = "vspherecapacity.microscaler.io/pool-finalizer";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vspherecapacity.microscaler.io",
    version = "v1",
    kind = "Pool",
    namespaced,
    status = "PoolStatus",
    printcolumn = r#"{"name":"vCPUs","type":"integer","jsonPath":".status.vcpusAvailable"}"#,
    printcolumn = r#"{"name":"Memory(GiB)","type":"integer","jsonPath":".status.memoryAvailable"}"#,
    printcolumn = r#"{"name":"Storage(GiB)","type":"integer","jsonPath":".status.storageAvailable"}"#,
    printcolumn = r#"{"name":"Networks","type":"integer","jsonPath":".status.networkAvailable"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PoolSpec {
    /// Total number of virtual CPUs provided by the pool.
    pub vcpus: i64,
    /// Total memory in GiB.
    pub memory: i64,
    /// Total storage in GiB.
    pub storage: i64,
    /// Multiplier applied to total vCPUs before demand is subtracted.
    /// Memory and storage are never over-committed.
    #[serde(default = "default_over_commit_ratio")]
    pub over_commit_ratio: f64,
    /// Placement of this pool within vSphere.
    pub failure_domain: FailureDomain,
    /// Physical datacenter hosting the pool. Networks are claimed per
    /// (datacenter, pod) so pools in the same pod contend for port-groups.
    #[serde(default)]
    pub physical_datacenter: PhysicalDatacenter,
    /// When true, the pool participates only when a lease names it via
    /// requiredPool.
    #[serde(default)]
    pub exclude: bool,
    /// When true, no new leases are scheduled to this pool.
    #[serde(default)]
    pub no_schedule: bool,
    /// Taints repel leases that do not tolerate them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
}

fn default_over_commit_ratio() -> f64 {
    1.0
}

/// Failure domain descriptor. Also copied into lease status so consumers can
/// locate their allocation without fetching the pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureDomain {
    #[serde(default)]
    pub name: String,
    /// vCenter server that provisions resources for this domain.
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_name: String,
    #[serde(default)]
    pub topology: Topology,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub compute_cluster: String,
    #[serde(default)]
    pub datastore: String,
    #[serde(default)]
    pub resource_pool: String,
    /// Full inventory paths of the port-groups reachable from this pool.
    /// A Network belongs to the pool when its portGroupName matches the last
    /// path component of one of these entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDatacenter {
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub pod: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    #[serde(default)]
    pub vcpus_available: i64,
    #[serde(default)]
    pub memory_available: i64,
    #[serde(default)]
    pub storage_available: i64,
    /// Count of the pool's port-groups not claimed by any lease in the same
    /// physical datacenter and pod.
    #[serde(default)]
    pub network_available: i64,
    /// Number of leases currently holding an owner reference to this pool.
    #[serde(default)]
    pub lease_count: i64,
    /// Set once the controller has populated status from spec totals and the
    /// subnet catalog. Never reverts to false.
    #[serde(default)]
    pub initialized: bool,
    /// Health probe input: a degraded pool is not schedulable.
    #[serde(default)]
    pub degraded: bool,
}

impl PoolSpec {
    /// Total vCPUs with the over-commit ratio applied.
    pub fn effective_vcpus(&self) -> i64 {
        (self.vcpus as f64 * self.over_commit_ratio).floor() as i64
    }
}

impl Pool {
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: crate::api_version(),
            kind: POOL_KIND.to_string(),
            name: self.meta().name.clone().unwrap_or_default(),
            uid: self.meta().uid.clone().unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Taint repelling leases from a pool, kube-scheduler style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub effect: TaintEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
}

/// Lease-side exemption from a matching taint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    /// Empty key with operator Exists tolerates every taint.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub operator: TolerationOperator,
    #[serde(default)]
    pub value: String,
    /// When unset the toleration matches taints of any effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<TaintEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum TolerationOperator {
    Exists,
    #[default]
    Equal,
}
