//! Service Kit - Assistant Tools
//!
//! Cluster tools that implement `assistant_core::Tool`. Each tool resolves
//! the selected cluster from the [`ToolContext`] at call time, so one
//! registry serves every cluster.

mod analyze_security;
mod cluster_info;
mod describe_resource;
mod list_pods;
mod list_resources;
mod pod_logs;
mod scale_deployment;

pub use analyze_security::AnalyzeSecurityTool;
pub use cluster_info::GetClusterInfoTool;
pub use describe_resource::DescribeResourceTool;
pub use list_pods::ListPodsTool;
pub use list_resources::ListResourcesTool;
pub use pod_logs::GetPodLogsTool;
pub use scale_deployment::ScaleDeploymentTool;

use std::sync::Arc;

use assistant_core::{Result as CoreResult, ToolContext};

use crate::cluster::ClusterHandle;

/// Listings are cut off after this many lines
pub const MAX_LIST_ITEMS: usize = 50;

fn cluster(ctx: &ToolContext, tool: &str) -> CoreResult<Arc<ClusterHandle>> {
    ClusterHandle::from_context(ctx).map_err(|e| e.into_tool_error(tool))
}

/// Models often send `""` for omitted optional strings
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Join listing lines, truncating long listings
fn render_list(lines: &[String], empty: &str) -> String {
    if lines.is_empty() {
        return empty.to_string();
    }
    if lines.len() > MAX_LIST_ITEMS {
        return format!(
            "{}\n... and {} more",
            lines[..MAX_LIST_ITEMS].join("\n"),
            lines.len() - MAX_LIST_ITEMS
        );
    }
    lines.join("\n")
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use assistant_core::ToolContext;

    use crate::cluster::{ClusterHandle, FixtureCluster};

    pub fn demo_context() -> (Arc<FixtureCluster>, ToolContext) {
        let cluster = Arc::new(FixtureCluster::demo());
        let ctx = ClusterHandle::new(cluster.clone()).attach(ToolContext::new());
        (cluster, ctx)
    }
}
