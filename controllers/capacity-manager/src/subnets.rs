//! Subnet catalog.
//!
//! A JSON document mapping a datacenter token to the network descriptors
//! physically present there. Loaded once at startup; pool initialization
//! matches each pool's server against the descriptors' `virtualcenter` to
//! learn which cataloged subnets the pool can reach.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ControllerError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(default)]
    pub virtualcenter: String,
    #[serde(default)]
    pub port_group_name: String,
    #[serde(default)]
    pub vlan_id: String,
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub pod: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub cidr: Option<i64>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubnetCatalog {
    by_datacenter: BTreeMap<String, Vec<Subnet>>,
}

impl SubnetCatalog {
    /// Loads the catalog from disk. A missing catalog is a configuration
    /// error: pools cannot resolve their port-group membership without it.
    pub fn load(path: &Path) -> Result<SubnetCatalog, ControllerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ControllerError::Catalog(format!("reading {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<SubnetCatalog, ControllerError> {
        let by_datacenter: BTreeMap<String, Vec<Subnet>> = serde_json::from_str(content)
            .map_err(|e| ControllerError::Catalog(format!("parsing subnet catalog: {}", e)))?;
        Ok(SubnetCatalog { by_datacenter })
    }

    /// All cataloged subnets served by the given vCenter, across datacenters.
    pub fn subnets_for_server(&self, server: &str) -> Vec<&Subnet> {
        self.by_datacenter
            .values()
            .flatten()
            .filter(|s| s.virtualcenter == server)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_datacenter.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
