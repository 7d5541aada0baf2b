//! Network reconciler.
//!
//! Registers networks in the index and manages the network finalizer:
//! deletion only completes once no lease owner-references the network, so a
//! port-group can never disappear out from under a running job.

use kube::Resource;
use tracing::{debug, info};

use crate::error::ControllerError;

use super::Reconciler;

impl Reconciler {
    pub async fn reconcile_network(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ControllerError> {
        let mut network = match self.store.get_network(namespace, name).await {
            Ok(network) => network,
            Err(e) if e.is_not_found() => {
                let mut state = self.index.lock().await;
                state.remove_network(name);
                self.metrics.update(&state);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut state = self.index.lock().await;

        if network.meta().deletion_timestamp.is_some() {
            let owners = state.network_owners(name).len();
            if owners > 0 {
                debug!("network {} still owned by {} leases", name, owners);
                return Err(ControllerError::NetworkInUse(name.to_string()));
            }
            if let Some(finalizers) = network.meta_mut().finalizers.as_mut() {
                finalizers.retain(|f| f != crds::NETWORK_FINALIZER);
            }
            self.store.update_network(&network).await?;
            state.remove_network(name);
            self.metrics.update(&state);
            info!("network {} released", name);
            return Ok(());
        }

        let finalizers = network.meta_mut().finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == crds::NETWORK_FINALIZER) {
            finalizers.push(crds::NETWORK_FINALIZER.to_string());
            network = self.store.update_network(&network).await?;
        }

        state.upsert_network(network);
        Ok(())
    }
}
