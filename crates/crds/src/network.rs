//! Network CRD
//!
//! One layer-2 segment, identified by its (VLAN id, datacenter) pair. A
//! network belongs to a pool when the pool's topology lists its port-group
//! and the pod matches. Ownership by leases is expressed through lease owner
//! references only; the network record itself carries no back-edges.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::CustomResource;
use kube::Resource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const NETWORK_KIND: &str = "Network";

/// Finalizer making deletion wait until no lease references the network.
pub const NETWORK_FINALIZER: &str = "vspherecapacity.microscaler.io/network-finalizer";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vspherecapacity.microscaler.io",
    version = "v1",
    kind = "Network",
    namespaced,
    printcolumn = r#"{"name":"PortGroup","type":"string","jsonPath":".spec.portGroupName"}"#,
    printcolumn = r#"{"name":"VLAN","type":"string","jsonPath":".spec.vlanId"}"#,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.networkType"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    pub port_group_name: String,
    #[serde(default)]
    pub vlan_id: String,
    #[serde(default)]
    pub datacenter_name: String,
    #[serde(default)]
    pub pod_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub primary_router_hostname: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidrs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_range: Option<String>,
    #[serde(default)]
    pub network_type: NetworkType,
}

/// Tenancy taxonomy of a network. An absent or empty value behaves as
/// single-tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum NetworkType {
    #[serde(rename = "")]
    Unspecified,
    #[default]
    #[serde(rename = "single-tenant")]
    SingleTenant,
    #[serde(rename = "multi-tenant")]
    MultiTenant,
    /// Enumerated for completeness; never selected by the scheduler.
    #[serde(rename = "disconnected")]
    Disconnected,
    #[serde(rename = "nested-multi-tenant")]
    NestedMultiTenant,
    #[serde(rename = "public-ipv6")]
    PublicIpv6,
}

impl NetworkType {
    /// Collapses the empty value onto the single-tenant default.
    pub fn normalized(self) -> NetworkType {
        match self {
            NetworkType::Unspecified => NetworkType::SingleTenant,
            other => other,
        }
    }

    /// Whether multiple non-terminating leases may reference the network at
    /// the same time.
    pub fn shareable(self) -> bool {
        self.normalized() == NetworkType::MultiTenant
    }

    pub fn as_str(self) -> &'static str {
        match self.normalized() {
            NetworkType::SingleTenant => "single-tenant",
            NetworkType::MultiTenant => "multi-tenant",
            NetworkType::Disconnected => "disconnected",
            NetworkType::NestedMultiTenant => "nested-multi-tenant",
            NetworkType::PublicIpv6 => "public-ipv6",
            NetworkType::Unspecified => unreachable!("normalized"),
        }
    }
}

impl Network {
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: crate::api_version(),
            kind: NETWORK_KIND.to_string(),
            name: self.meta().name.clone().unwrap_or_default(),
            uid: self.meta().uid.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Identity of the underlying segment. Two networks with the same pair
    /// are the same wire even if cataloged under different names.
    pub fn segment_key(&self) -> (String, String) {
        (
            self.spec.vlan_id.clone(),
            self.spec.datacenter_name.clone(),
        )
    }
}
