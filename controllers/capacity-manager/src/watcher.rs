//! Kubernetes resource watchers.
//!
//! One `kube_runtime::Controller` loop per record kind, all funneling into
//! the shared `Reconciler`. The generic `watch_resource` helper handles
//! reconnection and retry; the error policy requeues on the fibonacci
//! schedule driven by the reconciler's per-key error counts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{watcher, Controller};
use tracing::{debug, error, info};

use crds::{Lease, Network, Pool};

use crate::backoff;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

fn object_key<K: kube::Resource>(obj: &K) -> String {
    format!(
        "{}/{}",
        obj.meta().namespace.as_deref().unwrap_or("default"),
        obj.meta().name.as_deref().unwrap_or_default()
    )
}

/// Runs one controller loop until shutdown. Reconcile errors requeue with
/// backoff; successful reconciles wait for the next change.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource
        + Clone
        + Send
        + Sync
        + std::fmt::Debug
        + serde::de::DeserializeOwned
        + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, err: &ControllerError, ctx: Arc<Reconciler>| {
        let key = object_key(&*obj);
        let delay = backoff::requeue_after(ctx.error_count(&key));
        error!(
            "{} {} reconcile failed, requeue in {}s: {}",
            resource_name,
            key,
            delay.as_secs(),
            err
        );
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            debug!("reconciling {} {}", resource_name, object_key(&*obj));
            reconcile_fn(ctx, obj).await
        }
    };

    Controller::new(api, watcher::Config::default())
        .with_config(ControllerConfig::default().debounce(Duration::from_secs(1)))
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            if let Err(e) = result {
                debug!("{} controller stream error: {}", resource_name, e);
            }
        })
        .await;

    info!("{} watcher stopped", resource_name);
    Ok(())
}

/// Watches the three record kinds plus namespaces.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    pools: Api<Pool>,
    networks: Api<Network>,
    leases: Api<Lease>,
    namespaces: Api<Namespace>,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        pools: Api<Pool>,
        networks: Api<Network>,
        leases: Api<Lease>,
        namespaces: Api<Namespace>,
    ) -> Self {
        Self {
            reconciler,
            pools,
            networks,
            leases,
            namespaces,
        }
    }

    pub async fn watch_pools(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.pools.clone(),
            self.reconciler.clone(),
            |reconciler, pool: Arc<Pool>| {
                Box::pin(async move {
                    let namespace = pool.metadata.namespace.clone().unwrap_or_default();
                    let name = pool.metadata.name.clone().unwrap_or_default();
                    reconciler.reconcile_pool(&namespace, &name).await?;
                    Ok(Action::await_change())
                })
            },
            "Pool",
        )
        .await
    }

    pub async fn watch_networks(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.networks.clone(),
            self.reconciler.clone(),
            |reconciler, network: Arc<Network>| {
                Box::pin(async move {
                    let namespace = network.metadata.namespace.clone().unwrap_or_default();
                    let name = network.metadata.name.clone().unwrap_or_default();
                    reconciler.reconcile_network(&namespace, &name).await?;
                    Ok(Action::await_change())
                })
            },
            "Network",
        )
        .await
    }

    pub async fn watch_leases(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.leases.clone(),
            self.reconciler.clone(),
            |reconciler, lease: Arc<Lease>| {
                Box::pin(async move {
                    let namespace = lease.metadata.namespace.clone().unwrap_or_default();
                    let name = lease.metadata.name.clone().unwrap_or_default();
                    reconciler.reconcile_lease(&namespace, &name).await?;
                    Ok(Action::await_change())
                })
            },
            "Lease",
        )
        .await
    }

    pub async fn watch_namespaces(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.namespaces.clone(),
            self.reconciler.clone(),
            |reconciler, namespace: Arc<Namespace>| {
                Box::pin(async move {
                    reconciler.reconcile_namespace(&namespace).await?;
                    Ok(Action::await_change())
                })
            },
            "Namespace",
        )
        .await
    }
}
