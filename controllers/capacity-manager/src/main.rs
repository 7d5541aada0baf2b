//! vSphere capacity manager
//!
//! Watches Pool, Network, and Lease records and assigns shared
//! virtualization capacity to short-lived CI jobs: pools by constraint and
//! utilization, layer-2 networks by tenancy rules, fairness by age.

mod backoff;
mod capacity;
mod controller;
mod envvars;
mod error;
mod fit;
mod index;
mod metrics;
mod reconciler;
mod subnets;
mod watcher;

#[cfg(test)]
mod test_utils;

use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::controller::{Controller, Settings};
use crate::error::ControllerError;
use crate::fit::AllocationStrategy;
use crate::reconciler::SchedulerConfig;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("starting vSphere capacity manager");

    let subnets_path =
        PathBuf::from(env::var("SUBNETS_PATH").unwrap_or_else(|_| "subnets.json".to_string()));
    let namespace = env::var("WATCH_NAMESPACE").ok();
    let allow_multi_tenant_fallback = env::var("ALLOW_MULTI_TENANT_FALLBACK")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    let strategy = match env::var("ALLOCATION_STRATEGY") {
        Ok(value) => AllocationStrategy::parse(&value).ok_or_else(|| {
            ControllerError::InvalidConfig(format!("unknown allocation strategy {value:?}"))
        })?,
        Err(_) => AllocationStrategy::default(),
    };

    info!("  subnet catalog: {}", subnets_path.display());
    info!(
        "  namespace: {}",
        namespace.as_deref().unwrap_or("all namespaces")
    );
    info!("  multi-tenant fallback: {}", allow_multi_tenant_fallback);

    let controller = Controller::new(Settings {
        subnets_path,
        namespace,
        scheduler: SchedulerConfig {
            allow_multi_tenant_fallback,
            strategy,
        },
    })
    .await?;
    controller.run().await
}
