//! Cluster Info Tool

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;

use assistant_core::{JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema};

use super::cluster;
use crate::cluster::ClusterClient;
use crate::error::Result;

const NAME: &str = "get_cluster_info";
const MIB: u64 = 1024 * 1024;

/// Tool summarizing version, node capacity, namespaces and pod phases
pub struct GetClusterInfoTool;

async fn summarize(client: &dyn ClusterClient) -> Result<String> {
    let version = client.server_version().await?;
    let nodes = client.list_nodes().await?;

    let control_plane = nodes.iter().filter(|n| n.control_plane).count();
    let ready = nodes.iter().filter(|n| n.ready).count();
    let total_cpu: u64 = nodes.iter().map(|n| n.cpu_millis).sum();
    let total_mem: u64 = nodes.iter().map(|n| n.memory_bytes).sum();

    // Namespace and pod counts are best effort
    let namespaces = client.list_namespaces().await.map(|ns| ns.len()).unwrap_or_default();
    let pods = client.list_pods(None).await.unwrap_or_default();
    let mut phases = BTreeMap::new();
    for pod in &pods {
        *phases.entry(pod.phase.as_str()).or_insert(0usize) += 1;
    }

    let mut out = String::from("Cluster Information:\n");
    let _ = writeln!(out, "- Kubernetes Version: {}", version.git_version);
    let _ = writeln!(out, "- Platform: {}", version.platform);
    out.push_str("\nNode Summary:\n");
    let _ = writeln!(out, "- Total Nodes: {}", nodes.len());
    let _ = writeln!(out, "- Control Plane Nodes: {control_plane}");
    let _ = writeln!(out, "- Worker Nodes: {}", nodes.len() - control_plane);
    let _ = writeln!(out, "- Ready Nodes: {ready}");
    let _ = writeln!(out, "- Not Ready Nodes: {}", nodes.len() - ready);
    out.push_str("\nCapacity:\n");
    let _ = writeln!(out, "- Total CPU: {total_cpu}m");
    let _ = writeln!(out, "- Total Memory: {} MiB", total_mem / MIB);
    let _ = writeln!(out, "\nNamespaces: {namespaces}");
    let _ = writeln!(out, "\nPod Summary (Total: {}):", pods.len());
    for (phase, count) in phases {
        let _ = writeln!(out, "- {phase}: {count}");
    }
    Ok(out)
}

#[async_trait]
impl Tool for GetClusterInfoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Get general information about the Kubernetes cluster, including server version and capacity (nodes, CPU, memory).",
            JsonSchema::object(),
        )
    }

    async fn execute(&self, ctx: &ToolContext, _arguments: &str) -> CoreResult<String> {
        let cluster = cluster(ctx, NAME)?;
        summarize(cluster.client()).await.map_err(|e| e.into_tool_error(NAME))
    }
}
