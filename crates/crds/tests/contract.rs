//! Wire-format contract tests.
//!
//! Field names, enum values, and defaults are visible to operators and to
//! the column printers; these tests pin them down so a refactor cannot
//! silently rename them.

use crds::{
    Condition, ConditionSeverity, ConditionStatus, ConditionType, Lease, Network, NetworkType,
    Phase, Pool, TaintEffect, Toleration, TolerationOperator,
};

#[test]
fn pool_spec_uses_contractual_field_names() {
    let pool: Pool = serde_json::from_value(serde_json::json!({
        "apiVersion": "vspherecapacity.microscaler.io/v1",
        "kind": "Pool",
        "metadata": {"name": "pool-0", "namespace": "default"},
        "spec": {
            "vcpus": 48,
            "memory": 192,
            "storage": 2000,
            "overCommitRatio": 1.5,
            "failureDomain": {
                "name": "pool-0",
                "server": "vcenter.example.com",
                "region": "us-east",
                "zone": "zone-a",
                "topology": {
                    "datacenter": "dc",
                    "computeCluster": "/dc/host/cluster",
                    "datastore": "/dc/datastore/ds",
                    "resourcePool": "/dc/host/cluster/Resources",
                    "networks": ["/dc/host/ci-vlan-00"]
                }
            },
            "physicalDatacenter": {"datacenter": "dal10", "pod": "pod-0"},
            "noSchedule": true,
            "taints": [{"key": "dedicated", "value": "gpu", "effect": "NoSchedule"}]
        }
    }))
    .unwrap();

    assert_eq!(pool.spec.over_commit_ratio, 1.5);
    assert!(pool.spec.no_schedule);
    assert_eq!(pool.spec.taints[0].effect, TaintEffect::NoSchedule);
    assert_eq!(pool.spec.effective_vcpus(), 72);

    let value = serde_json::to_value(&pool.spec).unwrap();
    assert!(value.get("overCommitRatio").is_some());
    assert!(value.get("failureDomain").is_some());
    assert!(value.get("physicalDatacenter").is_some());
    assert!(value["failureDomain"]["topology"].get("computeCluster").is_some());
}

#[test]
fn pool_status_serializes_camel_case_columns() {
    let mut pool: Pool = serde_json::from_value(serde_json::json!({
        "apiVersion": "vspherecapacity.microscaler.io/v1",
        "kind": "Pool",
        "metadata": {"name": "pool-0"},
        "spec": {
            "vcpus": 48, "memory": 192, "storage": 2000,
            "failureDomain": {"name": "", "server": "", "region": "", "zone": ""}
        }
    }))
    .unwrap();
    // Over-commit ratio defaults to 1.0 when absent.
    assert_eq!(pool.spec.over_commit_ratio, 1.0);

    pool.status = Some(crds::PoolStatus {
        vcpus_available: 40,
        memory_available: 160,
        storage_available: 1800,
        network_available: 4,
        lease_count: 1,
        initialized: true,
        degraded: false,
    });
    let value = serde_json::to_value(&pool.status).unwrap();
    for key in [
        "vcpusAvailable",
        "memoryAvailable",
        "storageAvailable",
        "networkAvailable",
        "leaseCount",
        "initialized",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn network_type_values_are_kebab_case() {
    let cases = [
        (NetworkType::SingleTenant, "\"single-tenant\""),
        (NetworkType::MultiTenant, "\"multi-tenant\""),
        (NetworkType::Disconnected, "\"disconnected\""),
        (NetworkType::NestedMultiTenant, "\"nested-multi-tenant\""),
        (NetworkType::PublicIpv6, "\"public-ipv6\""),
        (NetworkType::Unspecified, "\"\""),
    ];
    for (value, expected) in cases {
        assert_eq!(serde_json::to_string(&value).unwrap(), expected);
    }

    // Empty and absent both behave as single-tenant.
    assert_eq!(
        NetworkType::Unspecified.normalized(),
        NetworkType::SingleTenant
    );
    let network: Network = serde_json::from_value(serde_json::json!({
        "apiVersion": "vspherecapacity.microscaler.io/v1",
        "kind": "Network",
        "metadata": {"name": "ci-vlan-00"},
        "spec": {"portGroupName": "ci-vlan-00"}
    }))
    .unwrap();
    assert_eq!(network.spec.network_type, NetworkType::SingleTenant);
}

#[test]
fn lease_defaults_and_phase_values() {
    let lease: Lease = serde_json::from_value(serde_json::json!({
        "apiVersion": "vspherecapacity.microscaler.io/v1",
        "kind": "Lease",
        "metadata": {"name": "l1", "namespace": "default"},
        "spec": {"vcpus": 16, "memory": 16, "storage": 120, "networks": 1}
    }))
    .unwrap();
    assert_eq!(lease.spec.pools, 1);
    assert_eq!(lease.spec.pool_count(), 1);
    assert_eq!(lease.spec.network_quota(), 1);
    assert!(lease.spec.tolerations.is_empty());

    for (phase, expected) in [
        (Phase::Pending, "\"Pending\""),
        (Phase::Partial, "\"Partial\""),
        (Phase::Fulfilled, "\"Fulfilled\""),
        (Phase::Failed, "\"Failed\""),
    ] {
        assert_eq!(serde_json::to_string(&phase).unwrap(), expected);
    }
}

#[test]
fn toleration_operator_defaults_to_equal() {
    let toleration: Toleration =
        serde_json::from_value(serde_json::json!({"key": "dedicated", "value": "gpu"})).unwrap();
    assert_eq!(toleration.operator, TolerationOperator::Equal);
    assert!(toleration.effect.is_none());
}

#[test]
fn condition_omits_empty_severity_and_renames_type() {
    let condition = Condition {
        condition_type: ConditionType::Fulfilled,
        status: ConditionStatus::True,
        severity: ConditionSeverity::None,
        reason: String::new(),
        message: String::new(),
        last_transition_time: None,
    };
    let value = serde_json::to_value(&condition).unwrap();
    assert_eq!(value["type"], "Fulfilled");
    assert_eq!(value["status"], "True");
    assert!(value.get("severity").is_none());
    assert!(value.get("reason").is_none());

    let warning = Condition::false_with_reason(
        ConditionType::Fulfilled,
        crds::REASON_NO_AVAILABLE_POOL,
        ConditionSeverity::Warning,
        "no pool fits",
    );
    let value = serde_json::to_value(&warning).unwrap();
    assert_eq!(value["severity"], "Warning");
    assert_eq!(value["reason"], "NoAvailablePool");
}

#[test]
fn crd_definitions_carry_the_api_group() {
    use kube::CustomResourceExt;
    for crd in [Pool::crd(), Network::crd(), Lease::crd()] {
        assert_eq!(crd.spec.group, crds::API_GROUP);
        assert_eq!(crd.spec.versions[0].name, crds::API_VERSION);
    }
    assert!(Lease::crd().spec.versions[0].subresources.is_some());
}
