//! Capacity manager CRD definitions
//!
//! Custom resources consumed by the capacity-manager controllers:
//! - Pool: a slice of vSphere cluster capacity plus its candidate port-groups
//! - Network: one layer-2 segment (port-group) with its addressing details
//! - Lease: a request for capacity that, once fulfilled, carries the allocation

pub mod conditions;
pub mod lease;
pub mod network;
pub mod pool;

pub use conditions::*;
pub use lease::*;
pub use network::*;
pub use pool::*;

/// API group shared by all record kinds.
pub const API_GROUP: &str = "vspherecapacity.microscaler.io";

/// API version shared by all record kinds.
pub const API_VERSION: &str = "v1";

/// Annotation written to pools and leases purely to trigger a reconcile
/// through the watch stream. Value is an RFC3339 timestamp.
pub const LAST_UPDATED_ANNOTATION: &str = "last-updated";

/// `group/version` string used in owner references.
pub fn api_version() -> String {
    format!("{}/{}", API_GROUP, API_VERSION)
}
