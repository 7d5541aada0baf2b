//! Env-var rendering for fulfilled leases.
//!
//! CI jobs consume their allocation as a block of shell assignments. The
//! template is fixed and contractual: one `export` line per variable, one
//! block per (pool, network) pair, stored in `status.envVarsMap` keyed by
//! pool name.

use crds::{Network, Pool};

/// Renders the shell-assignment block for a pool and one of its assigned
/// networks. The port-group value is the last path component of the pool
/// topology entry matching the network; dns falls back to the gateway when
/// the network has no name-servers.
pub fn render_env_vars(pool: &Pool, network: &Network) -> String {
    let topology = &pool.spec.failure_domain.topology;
    let port_group = resolve_port_group(pool, network);
    let gateway = network.spec.gateway.clone().unwrap_or_default();
    let dns_server = network
        .spec
        .nameservers
        .first()
        .cloned()
        .unwrap_or_else(|| gateway.clone());

    format!(
        "export vsphere_url=\"{server}\"\n\
         export GOVC_URL=\"{server}\"\n\
         export GOVC_DATACENTER=\"{datacenter}\"\n\
         export GOVC_DATASTORE=\"{datastore}\"\n\
         export GOVC_NETWORK=\"{port_group}\"\n\
         export vsphere_cluster=\"{cluster}\"\n\
         export vsphere_resource_pool=\"{resource_pool}\"\n\
         export vsphere_datacenter=\"{datacenter}\"\n\
         export vsphere_datastore=\"{datastore}\"\n\
         export vsphere_portgroup=\"{port_group}\"\n\
         export gateway=\"{gateway}\"\n\
         export dns_server=\"{dns_server}\"\n\
         export vlanid=\"{vlan_id}\"\n\
         export phydc=\"{phydc}\"\n\
         export primaryrouterhostname=\"{router}\"",
        server = pool.spec.failure_domain.server,
        datacenter = topology.datacenter,
        datastore = topology.datastore,
        cluster = topology.compute_cluster,
        resource_pool = topology.resource_pool,
        port_group = port_group,
        gateway = gateway,
        dns_server = dns_server,
        vlan_id = network.spec.vlan_id,
        phydc = pool.spec.physical_datacenter.datacenter,
        router = network.spec.primary_router_hostname,
    )
}

/// Last path component of the topology entry naming this network's
/// port-group. Falls back to the bare port-group name when the pool does not
/// list the network (cross-vCenter shared networks).
fn resolve_port_group(pool: &Pool, network: &Network) -> String {
    let wanted = &network.spec.port_group_name;
    let entry = pool
        .spec
        .failure_domain
        .topology
        .networks
        .iter()
        .find(|e| e.contains(wanted.as_str()));
    match entry {
        Some(path) => {
            let tokens: Vec<&str> = path.split('/').collect();
            if tokens.len() >= 3 {
                tokens[tokens.len() - 1].to_string()
            } else {
                path.clone()
            }
        }
        None => wanted.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_network, test_pool};
    use crds::NetworkType;

    #[test]
    fn renders_one_export_per_variable() {
        let pool = test_pool("pool-0", 48, 192, 2000);
        let network = test_network("ci-vlan-00", "1100", NetworkType::SingleTenant);

        let rendered = render_env_vars(&pool, &network);
        assert_eq!(rendered.lines().count(), 15);
        assert!(rendered.contains("export vsphere_url=\"vcenter-pool-0.ci.example.com\""));
        assert!(rendered.contains("export vlanid=\"1100\""));
        assert!(rendered.contains("export GOVC_NETWORK=\"ci-vlan-00\""));
    }

    #[test]
    fn port_group_is_last_path_component_of_topology_entry() {
        let pool = test_pool("pool-0", 48, 192, 2000);
        let network = test_network("ci-vlan-01", "1101", NetworkType::SingleTenant);

        let rendered = render_env_vars(&pool, &network);
        // Topology entries look like /<dc>/host/<pg>; only the leaf is used.
        assert!(rendered.contains("export vsphere_portgroup=\"ci-vlan-01\""));
        assert!(!rendered.contains("host/ci-vlan-01"));
    }

    #[test]
    fn dns_server_falls_back_to_gateway() {
        let pool = test_pool("pool-0", 48, 192, 2000);
        let mut network = test_network("ci-vlan-00", "1100", NetworkType::SingleTenant);
        network.spec.nameservers.clear();
        network.spec.gateway = Some("192.168.100.1".to_string());

        let rendered = render_env_vars(&pool, &network);
        assert!(rendered.contains("export dns_server=\"192.168.100.1\""));
    }

    #[test]
    fn nameserver_wins_over_gateway() {
        let pool = test_pool("pool-0", 48, 192, 2000);
        let mut network = test_network("ci-vlan-00", "1100", NetworkType::SingleTenant);
        network.spec.nameservers = vec!["8.8.8.8".to_string()];
        network.spec.gateway = Some("192.168.100.1".to_string());

        let rendered = render_env_vars(&pool, &network);
        assert!(rendered.contains("export dns_server=\"8.8.8.8\""));
    }
}
