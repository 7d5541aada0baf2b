//! Record store access
//!
//! The scheduler consumes the declarative object store through a narrow
//! get/list/update/update-status/delete surface. `RecordStore` captures that
//! surface as a trait, `KubeStore` implements it against the Kubernetes API,
//! and `MockStore` (feature `test-util`) provides the in-memory
//! implementation the reconciler tests run against.
//!
//! Watching is not part of this trait: watch streams are wired in the
//! controller via kube-runtime and only ever deliver keys to reconcilers,
//! which re-fetch through this interface.

pub mod error;
pub mod kube_store;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
#[path = "trait.rs"]
pub mod store_trait;

pub use error::StoreError;
pub use kube_store::KubeStore;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockStore;
pub use store_trait::RecordStore;
