//! Controller wiring.
//!
//! Builds the kube client, loads the subnet catalog, primes the shared
//! index, and runs one watcher task per record kind until the first of them
//! exits (error or shutdown signal).

use std::path::PathBuf;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;
use kube::Client;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crds::{Lease, Network, Pool};
use record_store::KubeStore;

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, SchedulerConfig};
use crate::subnets::SubnetCatalog;
use crate::watcher::Watcher;

pub struct Settings {
    pub subnets_path: PathBuf,
    /// When set, only this namespace's records are watched.
    pub namespace: Option<String>,
    pub scheduler: SchedulerConfig,
}

pub struct Controller {
    pool_watcher: JoinHandle<Result<(), ControllerError>>,
    network_watcher: JoinHandle<Result<(), ControllerError>>,
    lease_watcher: JoinHandle<Result<(), ControllerError>>,
    namespace_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    pub async fn new(settings: Settings) -> Result<Self, ControllerError> {
        let client = Client::try_default().await?;
        let catalog = SubnetCatalog::load(&settings.subnets_path)?;
        if catalog.is_empty() {
            warn!("subnet catalog is empty, pools will initialize without port-groups");
        }
        info!("loaded subnet catalog with {} entries", catalog.len());

        let store = Arc::new(KubeStore::new(client.clone()));
        let reconciler = Arc::new(Reconciler::new(store, catalog, settings.scheduler));
        reconciler.prime().await?;

        let (pools, networks, leases): (Api<Pool>, Api<Network>, Api<Lease>) =
            match settings.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(client.clone(), ns),
                    Api::namespaced(client.clone(), ns),
                    Api::namespaced(client.clone(), ns),
                ),
                None => (
                    Api::all(client.clone()),
                    Api::all(client.clone()),
                    Api::all(client.clone()),
                ),
            };
        let namespaces: Api<Namespace> = Api::all(client);

        let watcher = Arc::new(Watcher::new(
            reconciler, pools, networks, leases, namespaces,
        ));

        let pool_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_pools().await })
        };
        let network_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_networks().await })
        };
        let lease_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_leases().await })
        };
        let namespace_watcher = {
            let watcher = watcher;
            tokio::spawn(async move { watcher.watch_namespaces().await })
        };

        Ok(Self {
            pool_watcher,
            network_watcher,
            lease_watcher,
            namespace_watcher,
        })
    }

    /// Runs until any watcher exits. The watchers stop on their own when the
    /// process receives a termination signal.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        tokio::select! {
            result = &mut self.lease_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Lease watcher panicked: {e}")))??;
            }
            result = &mut self.pool_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Pool watcher panicked: {e}")))??;
            }
            result = &mut self.network_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Network watcher panicked: {e}")))??;
            }
            result = &mut self.namespace_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Namespace watcher panicked: {e}")))??;
            }
        }
        Ok(())
    }
}
