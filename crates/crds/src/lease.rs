//! Lease CRD
//!
//! A lease is a declarative request for capacity. The scheduler binds it to
//! pools and networks by appending owner references; the allocation result
//! (failure domains, env vars, job link) is written to status. Deleting a
//! fulfilled lease releases everything it held.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::CustomResource;
use kube::Resource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::conditions::Condition;
use crate::network::{NetworkType, NETWORK_KIND};
use crate::pool::{FailureDomain, Toleration, POOL_KIND};

pub const LEASE_KIND: &str = "Lease";

/// Finalizer ensuring pool capacity and network ownership are released
/// before the record disappears.
pub const LEASE_FINALIZER: &str = "vspherecapacity.microscaler.io/lease-finalizer";

/// Label grouping leases that must share networks across vCenters.
pub const BOSKOS_LEASE_ID_LABEL: &str = "boskos-lease-id";

/// Label carrying the CI job name, for logging and metrics.
pub const JOB_NAME_LABEL: &str = "job-name";

/// Label tying a lease to the namespace whose deletion cascades to it.
pub const LEASE_NAMESPACE_LABEL: &str = "lease-namespace";

// Annotations combined into the job-link URL.
pub const JOB_TYPE_ANNOTATION: &str = "prow-job-type";
pub const JOB_NAME_ANNOTATION: &str = "prow-job-name";
pub const BUILD_ID_ANNOTATION: &str = "prow-build-id";
pub const URL_PREFIX_ANNOTATION: &str = "prow-url-prefix";
pub const GS_BUCKET_ANNOTATION: &str = "prow-gs-bucket";
pub const GIT_ORG_ANNOTATION: &str = "git-org";
pub const GIT_REPO_ANNOTATION: &str = "git-repo";
pub const GIT_PR_ANNOTATION: &str = "git-pr";

pub const JOB_TYPE_PERIODIC: &str = "periodic";
pub const JOB_TYPE_PRESUBMIT: &str = "presubmit";

pub const DEFAULT_URL_PREFIX: &str = "https://prow.ci.openshift.org/view/";
pub const DEFAULT_GS_BUCKET: &str = "test-platform-results";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vspherecapacity.microscaler.io",
    version = "v1",
    kind = "Lease",
    namespaced,
    status = "LeaseStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"vCPUs","type":"integer","jsonPath":".spec.vcpus"}"#,
    printcolumn = r#"{"name":"Memory(GiB)","type":"integer","jsonPath":".spec.memory"}"#,
    printcolumn = r#"{"name":"NetworkType","type":"string","jsonPath":".spec.networkType"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LeaseSpec {
    #[serde(default)]
    pub vcpus: i64,
    #[serde(default)]
    pub memory: i64,
    #[serde(default)]
    pub storage: i64,
    /// Number of networks requested per assigned pool.
    #[serde(default)]
    pub networks: i64,
    /// Number of distinct pools the lease must be bound to.
    #[serde(default = "default_pool_count")]
    pub pools: i64,
    /// When set, only the named pool satisfies this lease.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub required_pool: String,
    /// Every entry must match a pool label exactly.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pool_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    #[serde(default)]
    pub network_type: NetworkType,
}

fn default_pool_count() -> i64 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaseStatus {
    #[serde(default)]
    pub phase: Phase,
    /// Failure domain of the first assigned pool. Deprecated in favor of
    /// poolInfo; kept for single-pool consumers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_domain: Option<FailureDomain>,
    /// One failure domain per assigned pool, each listing only the networks
    /// assigned to that pool.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pool_info: Vec<FailureDomain>,
    /// Rendered env vars of the most recently assigned pool. Deprecated in
    /// favor of envVarsMap.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub env_vars: String,
    /// Rendered env vars keyed by pool name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars_map: BTreeMap<String, String>,
    /// URL of the CI job this lease serves.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_link: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Phase {
    #[default]
    Pending,
    Partial,
    Fulfilled,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Partial => "Partial",
            Phase::Fulfilled => "Fulfilled",
            Phase::Failed => "Failed",
        }
    }
}

impl LeaseSpec {
    /// Requested pool count, defaulting to one.
    pub fn pool_count(&self) -> i64 {
        self.pools.max(1)
    }

    /// Total networks the lease must hold to be fulfilled.
    pub fn network_quota(&self) -> i64 {
        self.networks * self.pool_count()
    }

    /// Network-only leases (zero compute) never share boskos networks.
    pub fn has_compute(&self) -> bool {
        self.vcpus > 0 || self.memory > 0
    }
}

impl Lease {
    /// `namespace/name`, the index key.
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.meta().namespace.as_deref().unwrap_or("default"),
            self.meta().name.as_deref().unwrap_or_default()
        )
    }

    pub fn is_terminating(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    pub fn owner_refs_of_kind(&self, kind: &str) -> Vec<&OwnerReference> {
        self.meta()
            .owner_references
            .iter()
            .flatten()
            .filter(|r| r.kind == kind)
            .collect()
    }

    pub fn pool_refs(&self) -> Vec<&OwnerReference> {
        self.owner_refs_of_kind(POOL_KIND)
    }

    pub fn network_refs(&self) -> Vec<&OwnerReference> {
        self.owner_refs_of_kind(NETWORK_KIND)
    }

    pub fn owns(&self, kind: &str, name: &str) -> bool {
        self.owner_refs_of_kind(kind).iter().any(|r| r.name == name)
    }

    pub fn boskos_id(&self) -> Option<&str> {
        self.meta()
            .labels
            .as_ref()
            .and_then(|l| l.get(BOSKOS_LEASE_ID_LABEL))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn network_type(&self) -> NetworkType {
        self.spec.network_type.normalized()
    }
}
