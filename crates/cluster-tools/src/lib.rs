//! # cluster-tools
//!
//! The Kubernetes tools the dashboard assistant can call, and the system
//! prompt that tells the model how to use them.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  x-cluster   ┌───────────────┐   ToolContext   ┌──────────────┐
//! │ HTTP request │ ───────────► │ ClusterHandle │ ──────────────► │ ToolRegistry │
//! └──────────────┘              └───────┬───────┘   (target)      └──────┬───────┘
//!                                       │                                │
//!                                       ▼                                ▼
//!                               dyn ClusterClient ◄──────────── list_pods, get_pod_logs,
//!                               (live or fixture)                describe_resource, ...
//! ```
//!
//! Tools are stateless; the selected cluster travels with each call.

pub mod cluster;
pub mod error;
pub mod model;
pub mod svckit;

pub use cluster::{ClusterClient, ClusterHandle, FixtureCluster};
pub use error::{ClusterError, Result};
pub use model::{
    Deployment, Node, ObjectMeta, Pod, PodPhase, ResourceKind, SecurityContext, ServerVersion, Service,
};

use assistant_core::ToolRegistry;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        AnalyzeSecurityTool,
        DescribeResourceTool,
        GetClusterInfoTool,
        GetPodLogsTool,
        ListPodsTool,
        ListResourcesTool,
        ScaleDeploymentTool,
    };
}

/// Register every cluster tool
pub fn register_all(registry: &mut ToolRegistry) -> assistant_core::Result<()> {
    registry.register(tools::ListPodsTool)?;
    registry.register(tools::GetPodLogsTool)?;
    registry.register(tools::DescribeResourceTool)?;
    registry.register(tools::ScaleDeploymentTool)?;
    registry.register(tools::AnalyzeSecurityTool)?;
    registry.register(tools::ListResourcesTool)?;
    registry.register(tools::GetClusterInfoTool)?;
    Ok(())
}

/// System prompt for the Kubernetes assistant
pub const KUBE_ASSISTANT_PROMPT: &str = r#"You are a helpful Kubernetes assistant inside a Kubernetes dashboard. You have access to the cluster via tools. You are specifically designed to assist with Kubernetes, DevOps, and cluster management tasks. If a user asks a question that is entirely unrelated to these topics (e.g., general knowledge, weather, personal advice), politely inform them that you are only able to help with cluster management and DevOps related queries.

## Missing Parameters

If a user request is missing a key parameter (like a node name, a namespace, or a specific pod), do NOT just ask for the missing information. Instead, use your tools (like `list_resources` with the appropriate `kind`) to fetch a list of available options, present them to the user in a clear list or table, and ask them to select one. For example, if asked about pods on "a node", first use `list_resources` to show all nodes and then ask the user which one they mean.

If the user asks for resources but doesn't provide a full name, use `list_resources` with the `name_filter` parameter to find what they're looking for.

## Multi-step Queries

For complex queries that cannot be solved with a single tool call, you MUST:

1. Plan the steps inside a <thought> block (e.g., Step 1: list the pods on the node. Step 2: read the logs of the failing ones).
2. Execute tools sequentially to gather the necessary information.
3. Explain your plan and progress in the thought block.

## Changes to the Cluster

`scale_deployment` changes the cluster. Call it without `confirm` first, show the user the summary it returns, and only call it again with `confirm: true` after the user explicitly agrees.

## Response Format

Provide your reasoning enclosed in <thought> tags on every turn, then the final response for the user. Use markdown for the final response, with bold text for emphasis and tables for structured data. Be concise.

If a tool returns an error about a missing cluster context, ask the user to select a cluster in the dashboard.

## Tools Available

- `list_pods` - Pods by namespace, status or node
- `get_pod_logs` - Recent log lines of a pod
- `describe_resource` - Full JSON of one resource
- `list_resources` - Resources of any supported kind, with name filtering
- `get_cluster_info` - Version, node capacity and pod summary
- `scale_deployment` - Change a deployment's replica count (needs confirmation)
- `analyze_security` - Security posture of a Pod or Deployment"#;
