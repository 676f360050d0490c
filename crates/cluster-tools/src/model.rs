//! Domain Models
//!
//! A trimmed view of the Kubernetes objects the assistant reasons about.
//! Only the fields the tools report are modelled.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClusterError;

/// Metadata shared by every object
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    /// `None` for cluster-scoped objects (nodes, namespaces)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub uid: Uuid,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    pub creation_timestamp: DateTime<Utc>,
}

impl ObjectMeta {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            uid: Uuid::new_v4(),
            labels: BTreeMap::new(),
            creation_timestamp: Utc::now(),
        }
    }

    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            uid: Uuid::new_v4(),
            labels: BTreeMap::new(),
            creation_timestamp: Utc::now(),
        }
    }

    /// `namespace/name`, or just `name` when cluster-scoped
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn in_namespace(&self, namespace: Option<&str>) -> bool {
        namespace.is_none_or(|ns| self.namespace.as_deref() == Some(ns))
    }

    /// Age in the short form `kubectl get` prints (`45s`, `12m`, `5h`, `3d`)
    pub fn age(&self, now: DateTime<Utc>) -> String {
        let secs = (now - self.creation_timestamp).num_seconds().max(0);
        match secs {
            s if s < 60 => format!("{s}s"),
            s if s < 3_600 => format!("{}m", s / 60),
            s if s < 86_400 => format!("{}h", s / 3_600),
            s => format!("{}d", s / 86_400),
        }
    }
}

/// Pod lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Running,
    Pending,
    Failed,
    Succeeded,
    Unknown,
}

impl PodPhase {
    pub const ALL: [Self; 5] = [Self::Running, Self::Pending, Self::Failed, Self::Succeeded, Self::Unknown];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Succeeded => "Succeeded",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PodPhase {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClusterError::InvalidArgument(format!("unknown pod phase: {s}")))
    }
}

/// Container security settings the assistant inspects
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_non_root: Option<bool>,
}

impl SecurityContext {
    /// Unprivileged and forced non-root
    pub const fn restricted() -> Self {
        Self {
            privileged: Some(false),
            run_as_non_root: Some(true),
        }
    }
}

const fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restart_count: u32,

    /// `None` when the container declares no security context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    pub phase: PodPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,

    pub containers: Vec<ContainerStatus>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub host_network: bool,

    #[serde(default, rename = "hostPID", skip_serializing_if = "is_false")]
    pub host_pid: bool,
}

impl Pod {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, phase: PodPhase) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            node_name: None,
            phase,
            pod_ip: None,
            containers: Vec::new(),
            host_network: false,
            host_pid: false,
        }
    }

    #[must_use]
    pub fn on_node(mut self, node: impl Into<String>, ip: impl Into<String>) -> Self {
        self.node_name = Some(node.into());
        self.pod_ip = Some(ip.into());
        self
    }

    #[must_use]
    pub fn container(mut self, name: impl Into<String>, image: impl Into<String>, restarts: u32) -> Self {
        self.containers.push(ContainerStatus {
            name: name.into(),
            image: image.into(),
            ready: self.phase == PodPhase::Running && restarts == 0,
            restart_count: restarts,
            security_context: None,
        });
        self
    }

    /// Apply `context` to every container added so far
    #[must_use]
    pub fn secured(mut self, context: SecurityContext) -> Self {
        for container in &mut self.containers {
            container.security_context = Some(context);
        }
        self
    }

    #[must_use]
    pub const fn host_namespaces(mut self, network: bool, pid: bool) -> Self {
        self.host_network = network;
        self.host_pid = pid;
        self
    }

    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    /// Restarts summed over all containers
    pub fn restarts(&self) -> u32 {
        self.containers.iter().map(|c| c.restart_count).sum()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub replicas: u32,
    pub ready_replicas: u32,

    /// Image of the template's single container, which carries the
    /// deployment's name
    pub image: String,

    /// Security context of the template's container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub host_network: bool,

    #[serde(default, rename = "hostPID", skip_serializing_if = "is_false")]
    pub host_pid: bool,
}

impl Deployment {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, image: impl Into<String>, replicas: u32) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            replicas,
            ready_replicas: replicas,
            image: image.into(),
            security_context: None,
            host_network: false,
            host_pid: false,
        }
    }

    #[must_use]
    pub const fn ready(mut self, ready_replicas: u32) -> Self {
        self.ready_replicas = ready_replicas;
        self
    }

    #[must_use]
    pub const fn secured(mut self, context: SecurityContext) -> Self {
        self.security_context = Some(context);
        self
    }

    #[must_use]
    pub const fn host_namespaces(mut self, network: bool, pid: bool) -> Self {
        self.host_network = network;
        self.host_pid = pid;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub metadata: ObjectMeta,

    /// `ClusterIP`, `NodePort`, `LoadBalancer`
    #[serde(rename = "type")]
    pub service_type: String,

    pub cluster_ip: String,
    pub ports: Vec<u16>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub metadata: ObjectMeta,
    pub ready: bool,
    pub control_plane: bool,

    /// CPU capacity in millicores
    pub cpu_millis: u64,

    pub memory_bytes: u64,
    pub operating_system: String,
    pub architecture: String,
    pub kubelet_version: String,
}

/// Resource kinds the tools can list and describe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    Deployment,
    Service,
    Node,
    Namespace,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [Self::Pod, Self::Deployment, Self::Service, Self::Node, Self::Namespace];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::Node => "Node",
            Self::Namespace => "Namespace",
        }
    }

    pub const fn is_namespaced(self) -> bool {
        matches!(self, Self::Pod | Self::Deployment | Self::Service)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ClusterError;

    /// Accepts singular, plural and `kubectl` short names, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pod" | "pods" | "po" => Ok(Self::Pod),
            "deployment" | "deployments" | "deploy" => Ok(Self::Deployment),
            "service" | "services" | "svc" => Ok(Self::Service),
            "node" | "nodes" | "no" => Ok(Self::Node),
            "namespace" | "namespaces" | "ns" => Ok(Self::Namespace),
            _ => Err(ClusterError::UnsupportedKind(s.to_string())),
        }
    }
}

/// Version and platform reported by the API server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerVersion {
    pub git_version: String,
    pub platform: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_kind_aliases() {
        assert_eq!("pods".parse::<ResourceKind>().unwrap(), ResourceKind::Pod);
        assert_eq!("Deploy".parse::<ResourceKind>().unwrap(), ResourceKind::Deployment);
        assert_eq!(" svc ".parse::<ResourceKind>().unwrap(), ResourceKind::Service);
        assert!(matches!(
            "ConfigMap".parse::<ResourceKind>(),
            Err(ClusterError::UnsupportedKind(k)) if k == "ConfigMap"
        ));
    }

    #[test]
    fn test_phase_parse_ignores_case() {
        assert_eq!("running".parse::<PodPhase>().unwrap(), PodPhase::Running);
        assert!("Crashing".parse::<PodPhase>().is_err());
    }

    #[test]
    fn test_age_formatting() {
        let mut meta = ObjectMeta::cluster_scoped("n");
        let now = meta.creation_timestamp;
        assert_eq!(meta.age(now + Duration::seconds(42)), "42s");
        assert_eq!(meta.age(now + Duration::minutes(90)), "1h");
        meta.creation_timestamp = now - Duration::days(3);
        assert_eq!(meta.age(now), "3d");
    }

    #[test]
    fn test_restarts_sum_containers() {
        let pod = Pod::new("shop", "web", PodPhase::Running)
            .container("app", "web:1", 2)
            .container("sidecar", "envoy:1", 1);
        assert_eq!(pod.restarts(), 3);
        assert_eq!(pod.metadata.qualified_name(), "shop/web");
        assert!(pod.metadata.in_namespace(None));
        assert!(!pod.metadata.in_namespace(Some("default")));
    }

    #[test]
    fn test_security_fields_serialize_only_when_set() {
        let plain = serde_json::to_value(Pod::new("shop", "web", PodPhase::Running).container("app", "web:1", 0)).unwrap();
        assert!(plain.get("hostNetwork").is_none());
        assert!(plain["containers"][0].get("securityContext").is_none());

        let pod = Pod::new("shop", "agent", PodPhase::Running)
            .container("agent", "agent:1", 0)
            .secured(SecurityContext::restricted())
            .host_namespaces(true, true);
        let json = serde_json::to_value(&pod).unwrap();
        assert_eq!(json["hostNetwork"], true);
        assert_eq!(json["hostPID"], true);
        assert_eq!(json["containers"][0]["securityContext"]["runAsNonRoot"], true);
    }
}
