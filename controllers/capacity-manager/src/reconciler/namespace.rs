//! Namespace reconciler.
//!
//! When a watched namespace terminates, every lease labeled with it is
//! deleted. The leases themselves release capacity through the ordinary
//! lease deletion path; this reconciler only issues the deletes.

use k8s_openapi::api::core::v1::Namespace;
use kube::Resource;
use tracing::info;

use crds::LEASE_NAMESPACE_LABEL;

use crate::error::ControllerError;

use super::Reconciler;

impl Reconciler {
    pub async fn reconcile_namespace(&self, namespace: &Namespace) -> Result<(), ControllerError> {
        if namespace.meta().deletion_timestamp.is_none() {
            return Ok(());
        }
        let Some(name) = namespace.meta().name.as_deref() else {
            return Ok(());
        };

        // Collect matches under the lock, delete outside it: deletes trigger
        // lease reconciles that need the lock themselves.
        let to_delete: Vec<(String, String)> = self
            .index
            .with_lock(|state| {
                state
                    .leases
                    .values()
                    .filter(|lease| {
                        lease
                            .meta()
                            .labels
                            .as_ref()
                            .and_then(|l| l.get(LEASE_NAMESPACE_LABEL))
                            .is_some_and(|v| v == name)
                    })
                    .map(|lease| {
                        (
                            lease.meta().namespace.clone().unwrap_or_default(),
                            lease.meta().name.clone().unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .await;

        for (lease_namespace, lease_name) in to_delete {
            info!(
                "namespace {} terminating, deleting lease {}/{}",
                name, lease_namespace, lease_name
            );
            self.store
                .delete_lease(&lease_namespace, &lease_name)
                .await?;
        }
        Ok(())
    }
}
