//! Kubernetes-backed record store.
//!
//! Thin adapter from the `RecordStore` surface onto typed `kube::Api`
//! calls. Gets and updates are namespaced per record; lists span all
//! namespaces so the shared index sees the whole fleet.

use kube::api::{Api, PostParams};
use kube::Client;

use crate::error::StoreError;
use crate::store_trait::RecordStore;
use crds::{Lease, Network, Pool, LEASE_KIND, NETWORK_KIND, POOL_KIND};

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pools(&self, namespace: &str) -> Api<Pool> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn networks(&self, namespace: &str) -> Api<Network> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn leases(&self, namespace: &str) -> Api<Lease> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of<K: kube::Resource>(record: &K) -> &str {
    record
        .meta()
        .namespace
        .as_deref()
        .unwrap_or("default")
}

fn name_of<K: kube::Resource>(record: &K, kind: &'static str) -> Result<String, StoreError> {
    record
        .meta()
        .name
        .clone()
        .ok_or_else(|| StoreError::not_found(kind, "<unnamed>"))
}

#[async_trait::async_trait]
impl RecordStore for KubeStore {
    async fn get_pool(&self, namespace: &str, name: &str) -> Result<Pool, StoreError> {
        Ok(self.pools(namespace).get(name).await?)
    }

    async fn list_pools(&self) -> Result<Vec<Pool>, StoreError> {
        let api: Api<Pool> = Api::all(self.client.clone());
        Ok(api.list(&Default::default()).await?.items)
    }

    async fn update_pool(&self, pool: &Pool) -> Result<Pool, StoreError> {
        let name = name_of(pool, POOL_KIND)?;
        Ok(self
            .pools(namespace_of(pool))
            .replace(&name, &PostParams::default(), pool)
            .await?)
    }

    async fn update_pool_status(&self, pool: &Pool) -> Result<Pool, StoreError> {
        let name = name_of(pool, POOL_KIND)?;
        Ok(self
            .pools(namespace_of(pool))
            .replace_status(&name, &PostParams::default(), serde_json::to_vec(pool)?)
            .await?)
    }

    async fn get_network(&self, namespace: &str, name: &str) -> Result<Network, StoreError> {
        Ok(self.networks(namespace).get(name).await?)
    }

    async fn list_networks(&self) -> Result<Vec<Network>, StoreError> {
        let api: Api<Network> = Api::all(self.client.clone());
        Ok(api.list(&Default::default()).await?.items)
    }

    async fn update_network(&self, network: &Network) -> Result<Network, StoreError> {
        let name = name_of(network, NETWORK_KIND)?;
        Ok(self
            .networks(namespace_of(network))
            .replace(&name, &PostParams::default(), network)
            .await?)
    }

    async fn get_lease(&self, namespace: &str, name: &str) -> Result<Lease, StoreError> {
        Ok(self.leases(namespace).get(name).await?)
    }

    async fn list_leases(&self) -> Result<Vec<Lease>, StoreError> {
        let api: Api<Lease> = Api::all(self.client.clone());
        Ok(api.list(&Default::default()).await?.items)
    }

    async fn update_lease(&self, lease: &Lease) -> Result<Lease, StoreError> {
        let name = name_of(lease, LEASE_KIND)?;
        Ok(self
            .leases(namespace_of(lease))
            .replace(&name, &PostParams::default(), lease)
            .await?)
    }

    async fn update_lease_status(&self, lease: &Lease) -> Result<Lease, StoreError> {
        let name = name_of(lease, LEASE_KIND)?;
        Ok(self
            .leases(namespace_of(lease))
            .replace_status(&name, &PostParams::default(), serde_json::to_vec(lease)?)
            .await?)
    }

    async fn delete_lease(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.leases(namespace)
            .delete(name, &Default::default())
            .await?;
        Ok(())
    }
}
