//! Cluster Access
//!
//! The tools talk to a cluster only through [`ClusterClient`]. The server
//! binds one client per request as the tool execution target.

mod fixture;

pub use fixture::FixtureCluster;

use std::sync::Arc;

use assistant_core::ToolContext;
use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClusterError, Result};
use crate::model::{Deployment, Node, Pod, ResourceKind, ServerVersion, Service};

/// Cluster client trait (Strategy pattern)
///
/// Implement this for each way of reaching a cluster: a live API server,
/// a cached informer view, or the in-memory fixture.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Display name of the cluster
    fn name(&self) -> &str;

    async fn server_version(&self) -> Result<ServerVersion>;

    /// Pods in `namespace`, or in all namespaces when `None`
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>>;

    /// Last `tail_lines` log lines of a pod's container (first container if `None`)
    async fn pod_logs(&self, namespace: &str, pod: &str, container: Option<&str>, tail_lines: usize) -> Result<String>;

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>>;

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Set a deployment's replica count, returning the updated object
    async fn scale_deployment(&self, namespace: &str, name: &str, replicas: u32) -> Result<Deployment>;

    /// Fetch one object as JSON
    async fn get_resource(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Value> {
        let qualified = if kind.is_namespaced() {
            format!("{namespace}/{name}")
        } else {
            name.to_string()
        };
        let found = match kind {
            ResourceKind::Pod => find(self.list_pods(Some(namespace)).await?, |p| p.metadata.name == name)?,
            ResourceKind::Deployment => {
                find(self.list_deployments(Some(namespace)).await?, |d| d.metadata.name == name)?
            }
            ResourceKind::Service => find(self.list_services(Some(namespace)).await?, |s| s.metadata.name == name)?,
            ResourceKind::Node => find(self.list_nodes().await?, |n| n.metadata.name == name)?,
            ResourceKind::Namespace => self
                .list_namespaces()
                .await?
                .into_iter()
                .find(|ns| ns == name)
                .map(|ns| serde_json::json!({ "metadata": { "name": ns } })),
        };
        found.ok_or_else(|| ClusterError::not_found(kind, qualified))
    }

    /// Check if the API server answers
    async fn health_check(&self) -> bool {
        self.server_version().await.is_ok()
    }
}

fn find<T: serde::Serialize>(items: Vec<T>, pred: impl Fn(&T) -> bool) -> Result<Option<Value>> {
    items
        .into_iter()
        .find(|item| pred(item))
        .map(serde_json::to_value)
        .transpose()
        .map_err(ClusterError::from)
}

/// Tool execution target wrapping the selected cluster
#[derive(Clone)]
pub struct ClusterHandle {
    client: Arc<dyn ClusterClient>,
}

impl ClusterHandle {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn ClusterClient {
        self.client.as_ref()
    }

    /// Bind this cluster as the execution target of `ctx`
    pub fn attach(self, ctx: ToolContext) -> ToolContext {
        let name = self.client.name().to_string();
        ctx.with_target(name, Arc::new(self))
    }

    /// The cluster bound to `ctx`
    pub fn from_context(ctx: &ToolContext) -> Result<Arc<Self>> {
        ctx.target::<Self>().ok_or(ClusterError::NoCluster)
    }
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ClusterHandle").field(&self.client.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_round_trips_through_context() {
        let ctx = ClusterHandle::new(Arc::new(FixtureCluster::demo())).attach(ToolContext::new());
        assert_eq!(ctx.target_name(), Some("demo"));

        let handle = ClusterHandle::from_context(&ctx).unwrap();
        assert!(handle.client().health_check().await);
        assert!(matches!(
            ClusterHandle::from_context(&ToolContext::new()),
            Err(ClusterError::NoCluster)
        ));
    }

    #[tokio::test]
    async fn test_get_resource_by_kind() {
        let cluster = FixtureCluster::demo();

        let deploy = cluster.get_resource(ResourceKind::Deployment, "shop", "web").await.unwrap();
        assert_eq!(deploy["metadata"]["name"], "web");
        assert_eq!(deploy["replicas"], 2);

        let node = cluster.get_resource(ResourceKind::Node, "", "worker-1").await.unwrap();
        assert_eq!(node["architecture"], "amd64");

        let ns = cluster.get_resource(ResourceKind::Namespace, "", "shop").await.unwrap();
        assert_eq!(ns["metadata"]["name"], "shop");

        let err = cluster.get_resource(ResourceKind::Pod, "shop", "ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "Pod shop/ghost not found");
    }
}
