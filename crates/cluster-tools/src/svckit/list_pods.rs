//! List Pods Tool

use async_trait::async_trait;
use serde::Deserialize;

use assistant_core::{
    JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema,
    tool::parse_arguments,
};

use super::{cluster, non_empty, render_list};
use crate::model::PodPhase;

const NAME: &str = "list_pods";

/// Tool for listing pods, optionally filtered by phase or node
pub struct ListPodsTool;

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default)]
    namespace: Option<String>,

    #[serde(default)]
    status_filter: Option<String>,

    #[serde(default)]
    node: Option<String>,
}

#[async_trait]
impl Tool for ListPodsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "List pods in a namespace, optionally filtered by status or node name. Use this tool when you need to see pods for a specific node or across the cluster.",
            JsonSchema::object()
                .property(
                    "namespace",
                    JsonSchema::string().describe("The namespace to list pods from. If empty, lists from all namespaces."),
                )
                .property(
                    "status_filter",
                    JsonSchema::string()
                        .one_of(PodPhase::ALL.map(PodPhase::as_str))
                        .describe("Filter pods by status phase."),
                )
                .property("node", JsonSchema::string().describe("Filter pods by node name.")),
        )
    }

    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> CoreResult<String> {
        let args: Args = parse_arguments(arguments)?;
        let phase = non_empty(args.status_filter)
            .map(|s| s.parse::<PodPhase>())
            .transpose()
            .map_err(|e| e.into_tool_error(NAME))?;
        let node = non_empty(args.node);

        let cluster = cluster(ctx, NAME)?;
        let pods = cluster
            .client()
            .list_pods(non_empty(args.namespace).as_deref())
            .await
            .map_err(|e| e.into_tool_error(NAME))?;

        let lines: Vec<String> = pods
            .iter()
            .filter(|p| phase.is_none_or(|ph| p.phase == ph))
            .filter(|p| node.is_none() || p.node_name == node)
            .map(|p| {
                format!(
                    "{} (Status: {}, Restarts: {}, IP: {})",
                    p.metadata.qualified_name(),
                    p.phase,
                    p.restarts(),
                    p.pod_ip.as_deref().unwrap_or("")
                )
            })
            .collect();

        tracing::debug!(tool = NAME, matched = lines.len(), "Listed pods");
        Ok(render_list(&lines, "No pods found."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svckit::test_support::demo_context;
    use assistant_core::AgentError;

    #[tokio::test]
    async fn test_lists_all_namespaces_by_default() {
        let (_, ctx) = demo_context();
        let out = ListPodsTool.execute(&ctx, "{}").await.unwrap();
        assert_eq!(out.lines().count(), 6);
        assert!(out.contains("shop/checkout-5c4b9d7f6-xyz12 (Status: Failed, Restarts: 7, IP: 10.244.1.20)"));
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let (_, ctx) = demo_context();
        let out = ListPodsTool
            .execute(&ctx, r#"{"namespace":"shop","status_filter":"Running","node":"worker-1"}"#)
            .await
            .unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().all(|l| l.starts_with("shop/web-")));

        let none = ListPodsTool
            .execute(&ctx, r#"{"namespace":"kube-system","status_filter":"Failed"}"#)
            .await
            .unwrap();
        assert_eq!(none, "No pods found.");
    }

    #[tokio::test]
    async fn test_empty_strings_mean_unset() {
        let (_, ctx) = demo_context();
        let out = ListPodsTool
            .execute(&ctx, r#"{"namespace":"","status_filter":"","node":""}"#)
            .await
            .unwrap();
        assert_eq!(out.lines().count(), 6);
    }

    #[tokio::test]
    async fn test_bad_phase_is_validation_error() {
        let (_, ctx) = demo_context();
        let err = ListPodsTool
            .execute(&ctx, r#"{"status_filter":"Exploded"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }

    #[tokio::test]
    async fn test_without_cluster() {
        let err = ListPodsTool.execute(&ToolContext::new(), "{}").await.unwrap_err();
        assert!(err.to_string().contains("kubernetes client not found in context"));
    }
}
