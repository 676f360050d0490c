//! In-memory Fixture Cluster
//!
//! For demo mode and tests. Holds a small static cluster; scaling mutates
//! it so a follow-up listing reflects the change.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::ClusterClient;
use crate::error::{ClusterError, Result};
use crate::model::{
    Deployment, Node, ObjectMeta, Pod, PodPhase, ResourceKind, SecurityContext, ServerVersion, Service,
};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Default)]
struct State {
    namespaces: Vec<String>,
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    deployments: Vec<Deployment>,
    services: Vec<Service>,

    /// Keyed by `namespace/pod/container`
    logs: BTreeMap<String, Vec<String>>,
}

/// Fixture cluster client
pub struct FixtureCluster {
    name: String,
    version: ServerVersion,
    state: RwLock<State>,
}

impl FixtureCluster {
    /// A cluster with no objects
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: ServerVersion {
                git_version: "v1.30.2".into(),
                platform: "linux/amd64".into(),
            },
            state: RwLock::new(State::default()),
        }
    }

    /// The demo cluster: one control-plane node, two workers (one not ready),
    /// and a small `shop` application with a crash-looping checkout service.
    ///
    /// Security posture: `web` and `coredns` are restricted, `checkout`
    /// allows root, `cart` declares no security context and the nightly
    /// report pod runs privileged in the host PID namespace.
    pub fn demo() -> Self {
        let allows_root = SecurityContext {
            privileged: Some(false),
            run_as_non_root: Some(false),
        };
        let privileged = SecurityContext {
            privileged: Some(true),
            run_as_non_root: None,
        };

        let created = Utc::now() - Duration::days(12);
        let aged = |mut meta: ObjectMeta| {
            meta.creation_timestamp = created;
            meta
        };

        let node = |name: &str, ready: bool, control_plane: bool| Node {
            metadata: aged(ObjectMeta::cluster_scoped(name)),
            ready,
            control_plane,
            cpu_millis: 4_000,
            memory_bytes: 16 * GIB,
            operating_system: "linux".into(),
            architecture: "amd64".into(),
            kubelet_version: "v1.30.2".into(),
        };

        let mut pods = vec![
            Pod::new("shop", "web-7d9f8b6c5d-abcde", PodPhase::Running)
                .on_node("worker-1", "10.244.1.12")
                .container("web", "ghcr.io/acme/web:2.4.1", 0)
                .secured(SecurityContext::restricted())
                .label("app", "web"),
            Pod::new("shop", "web-7d9f8b6c5d-fghij", PodPhase::Running)
                .on_node("worker-1", "10.244.1.13")
                .container("web", "ghcr.io/acme/web:2.4.1", 0)
                .secured(SecurityContext::restricted())
                .label("app", "web"),
            Pod::new("shop", "checkout-5c4b9d7f6-xyz12", PodPhase::Failed)
                .on_node("worker-1", "10.244.1.20")
                .container("checkout", "ghcr.io/acme/checkout:1.9.0", 7)
                .secured(allows_root)
                .label("app", "checkout"),
            Pod::new("shop", "cart-66f5c9d8b-pq7rs", PodPhase::Pending)
                .container("cart", "ghcr.io/acme/cart:0.3.0", 0)
                .label("app", "cart"),
            Pod::new("kube-system", "coredns-76f75df574-k8s9x", PodPhase::Running)
                .on_node("cp-1", "10.244.0.2")
                .container("coredns", "registry.k8s.io/coredns/coredns:v1.11.1", 0)
                .secured(SecurityContext::restricted()),
            Pod::new("default", "nightly-report-28793340-d2l4m", PodPhase::Succeeded)
                .on_node("worker-1", "10.244.1.31")
                .container("report", "ghcr.io/acme/report:1.0.0", 0)
                .secured(privileged)
                .host_namespaces(false, true),
        ];
        for pod in &mut pods {
            pod.metadata.creation_timestamp = created;
        }

        let deployments = vec![
            Deployment::new("shop", "web", "ghcr.io/acme/web:2.4.1", 2).secured(SecurityContext::restricted()),
            Deployment::new("shop", "checkout", "ghcr.io/acme/checkout:1.9.0", 1)
                .ready(0)
                .secured(allows_root),
            Deployment::new("shop", "cart", "ghcr.io/acme/cart:0.3.0", 1).ready(0),
            Deployment::new("kube-system", "coredns", "registry.k8s.io/coredns/coredns:v1.11.1", 1)
                .secured(SecurityContext::restricted()),
        ];

        let service = |namespace: &str, name: &str, service_type: &str, ip: &str, ports: Vec<u16>| Service {
            metadata: aged(ObjectMeta::namespaced(namespace, name)),
            service_type: service_type.into(),
            cluster_ip: ip.into(),
            ports,
        };

        let mut logs = BTreeMap::new();
        logs.insert(
            "shop/checkout-5c4b9d7f6-xyz12/checkout".to_string(),
            vec![
                "2024-06-01T10:15:01Z INFO  starting checkout service on :8080".to_string(),
                "2024-06-01T10:15:02Z INFO  connecting to payments at payments.shop.svc:443".to_string(),
                "2024-06-01T10:15:07Z WARN  payments connection attempt 1 failed: connection refused".to_string(),
                "2024-06-01T10:15:12Z WARN  payments connection attempt 2 failed: connection refused".to_string(),
                "2024-06-01T10:15:17Z ERROR giving up on payments backend".to_string(),
                "2024-06-01T10:15:17Z ERROR fatal: required dependency unavailable, exiting with code 1".to_string(),
            ],
        );
        logs.insert(
            "shop/web-7d9f8b6c5d-abcde/web".to_string(),
            vec![
                "GET /healthz 200 0.4ms".to_string(),
                "GET /api/products 200 12.1ms".to_string(),
                "GET /api/cart 502 3.2ms upstream=cart".to_string(),
            ],
        );

        let mut cluster = Self::empty("demo");
        cluster.state = RwLock::new(State {
            namespaces: vec!["default".into(), "kube-system".into(), "shop".into()],
            nodes: vec![
                node("cp-1", true, true),
                node("worker-1", true, false),
                node("worker-2", false, false),
            ],
            pods,
            deployments: deployments
                .into_iter()
                .map(|mut d| {
                    d.metadata.creation_timestamp = created;
                    d
                })
                .collect(),
            services: vec![
                service("default", "kubernetes", "ClusterIP", "10.96.0.1", vec![443]),
                service("shop", "web", "LoadBalancer", "10.96.12.40", vec![80, 443]),
                service("shop", "checkout", "ClusterIP", "10.96.12.41", vec![8080]),
            ],
            logs,
        });
        cluster
    }

    /// Rename the cluster
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a pod, creating its namespace if needed
    pub async fn add_pod(&self, pod: Pod) {
        let mut state = self.state.write().await;
        if let Some(ns) = &pod.metadata.namespace {
            if !state.namespaces.contains(ns) {
                state.namespaces.push(ns.clone());
                state.namespaces.sort();
            }
        }
        state.pods.push(pod);
    }

    /// Replace the log lines of a pod's container
    pub async fn set_logs(&self, namespace: &str, pod: &str, container: &str, lines: Vec<String>) {
        self.state
            .write()
            .await
            .logs
            .insert(format!("{namespace}/{pod}/{container}"), lines);
    }
}

fn namespaced<T: Clone>(items: &[T], namespace: Option<&str>, meta: impl Fn(&T) -> &ObjectMeta) -> Vec<T> {
    let mut out: Vec<T> = items
        .iter()
        .filter(|item| meta(item).in_namespace(namespace))
        .cloned()
        .collect();
    out.sort_by_key(|item| meta(item).qualified_name());
    out
}

#[async_trait]
impl ClusterClient for FixtureCluster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn server_version(&self) -> Result<ServerVersion> {
        Ok(self.version.clone())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>> {
        Ok(namespaced(&self.state.read().await.pods, namespace, |p| &p.metadata))
    }

    async fn pod_logs(&self, namespace: &str, pod: &str, container: Option<&str>, tail_lines: usize) -> Result<String> {
        let state = self.state.read().await;
        let found = state
            .pods
            .iter()
            .find(|p| p.metadata.namespace.as_deref() == Some(namespace) && p.metadata.name == pod)
            .ok_or_else(|| ClusterError::not_found(ResourceKind::Pod, format!("{namespace}/{pod}")))?;

        let container = match container {
            Some(name) => found
                .containers
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| ClusterError::InvalidArgument(format!("container {name} is not valid for pod {pod}")))?,
            None => found
                .containers
                .first()
                .ok_or_else(|| ClusterError::Api(format!("pod {pod} has no containers")))?,
        };

        let lines = state
            .logs
            .get(&format!("{namespace}/{pod}/{}", container.name))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = lines.len().saturating_sub(tail_lines);
        Ok(lines[start..].join("\n"))
    }

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>> {
        Ok(namespaced(&self.state.read().await.deployments, namespace, |d| &d.metadata))
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>> {
        Ok(namespaced(&self.state.read().await.services, namespace, |s| &s.metadata))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.state.read().await.nodes.clone())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.namespaces.clone())
    }

    async fn scale_deployment(&self, namespace: &str, name: &str, replicas: u32) -> Result<Deployment> {
        let mut state = self.state.write().await;
        let deployment = state
            .deployments
            .iter_mut()
            .find(|d| d.metadata.namespace.as_deref() == Some(namespace) && d.metadata.name == name)
            .ok_or_else(|| ClusterError::not_found(ResourceKind::Deployment, format!("{namespace}/{name}")))?;

        deployment.replicas = replicas;
        deployment.ready_replicas = deployment.ready_replicas.min(replicas);
        tracing::info!(cluster = %self.name, namespace, name, replicas, "Scaled deployment");
        Ok(deployment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_listing_is_sorted_and_filtered() {
        let cluster = FixtureCluster::demo();

        let all = cluster.list_pods(None).await.unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].metadata.qualified_name(), "default/nightly-report-28793340-d2l4m");

        let shop = cluster.list_pods(Some("shop")).await.unwrap();
        assert_eq!(shop.len(), 4);
        assert!(cluster.list_pods(Some("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logs_tail_and_container_check() {
        let cluster = FixtureCluster::demo();

        let tail = cluster
            .pod_logs("shop", "checkout-5c4b9d7f6-xyz12", None, 2)
            .await
            .unwrap();
        assert_eq!(tail.lines().count(), 2);
        assert!(tail.ends_with("exiting with code 1"));

        let err = cluster
            .pod_logs("shop", "checkout-5c4b9d7f6-xyz12", Some("sidecar"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidArgument(_)));

        let quiet = cluster.pod_logs("kube-system", "coredns-76f75df574-k8s9x", None, 10).await.unwrap();
        assert!(quiet.is_empty());
    }

    #[tokio::test]
    async fn test_scale_updates_state() {
        let cluster = FixtureCluster::demo();
        let scaled = cluster.scale_deployment("shop", "web", 1).await.unwrap();
        assert_eq!((scaled.replicas, scaled.ready_replicas), (1, 1));

        let listed = cluster.list_deployments(Some("shop")).await.unwrap();
        let web = listed.iter().find(|d| d.metadata.name == "web").unwrap();
        assert_eq!(web.replicas, 1);

        let err = cluster.scale_deployment("shop", "ghost", 3).await.unwrap_err();
        assert!(matches!(err, ClusterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_pod_registers_namespace() {
        let cluster = FixtureCluster::empty("lab");
        cluster.add_pod(Pod::new("batch", "job-1", PodPhase::Pending)).await;
        assert_eq!(cluster.list_namespaces().await.unwrap(), vec!["batch"]);
    }
}
