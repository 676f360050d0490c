//! Describe Resource Tool
//!
//! Returns one object as indented JSON for the model to read.

use async_trait::async_trait;
use serde::Deserialize;

use assistant_core::{
    JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema,
    tool::parse_arguments,
};

use crate::cluster::ClusterHandle;
use crate::error::{ClusterError, Result};
use crate::model::ResourceKind;

const NAME: &str = "describe_resource";

pub struct DescribeResourceTool;

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default)]
    namespace: String,
    kind: String,
    name: String,
}

#[async_trait]
impl Tool for DescribeResourceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Get details (JSON) of a specific resource",
            JsonSchema::object()
                .required_property("namespace", JsonSchema::string().describe("The namespace of the resource."))
                .required_property(
                    "kind",
                    JsonSchema::string().describe("The kind of resource (Pod, Deployment, Service, Node, Namespace)."),
                )
                .required_property("name", JsonSchema::string().describe("The name of the resource.")),
        )
    }

    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> CoreResult<String> {
        let args: Args = parse_arguments(arguments)?;
        describe(ctx, &args).await.map_err(|e| e.into_tool_error(NAME))
    }
}

async fn describe(ctx: &ToolContext, args: &Args) -> Result<String> {
    let kind: ResourceKind = args.kind.parse()?;
    if kind.is_namespaced() && args.namespace.trim().is_empty() {
        return Err(ClusterError::InvalidArgument(format!("namespace is required for {kind}")));
    }
    let cluster = ClusterHandle::from_context(ctx)?;
    let object = cluster.client().get_resource(kind, &args.namespace, &args.name).await?;
    Ok(serde_json::to_string_pretty(&object)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svckit::test_support::demo_context;
    use assistant_core::AgentError;

    #[tokio::test]
    async fn test_describes_deployment_as_json() {
        let (_, ctx) = demo_context();
        let out = DescribeResourceTool
            .execute(&ctx, r#"{"namespace":"shop","kind":"deployment","name":"checkout"}"#)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["metadata"]["namespace"], "shop");
        assert_eq!(value["readyReplicas"], 0);
        assert!(out.contains("\n  "));
    }

    #[tokio::test]
    async fn test_cluster_scoped_kind_ignores_namespace() {
        let (_, ctx) = demo_context();
        let out = DescribeResourceTool
            .execute(&ctx, r#"{"namespace":"","kind":"Node","name":"worker-2"}"#)
            .await
            .unwrap();
        assert!(out.contains("\"ready\": false"));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_kind_and_missing_namespace() {
        let (_, ctx) = demo_context();
        let err = DescribeResourceTool
            .execute(&ctx, r#"{"namespace":"shop","kind":"ConfigMap","name":"x"}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported resource kind: ConfigMap"));

        let err = DescribeResourceTool
            .execute(&ctx, r#"{"namespace":"","kind":"Pod","name":"x"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
