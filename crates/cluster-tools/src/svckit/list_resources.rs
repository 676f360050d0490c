//! List Resources Tool
//!
//! Generic listing by kind with an optional substring filter on names. The
//! assistant uses it to offer choices when the user leaves out a name.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use assistant_core::{
    JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema,
    tool::parse_arguments,
};

use super::{non_empty, render_list};
use crate::cluster::{ClusterClient, ClusterHandle};
use crate::error::Result;
use crate::model::ResourceKind;

const NAME: &str = "list_resources";

pub struct ListResourcesTool;

#[derive(Debug, Deserialize)]
struct Args {
    kind: String,

    #[serde(default)]
    namespace: Option<String>,

    #[serde(default)]
    name_filter: Option<String>,
}

#[async_trait]
impl Tool for ListResourcesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "List resources of a given kind, optionally within a namespace and filtered by a partial name. Use this to discover names before calling other tools.",
            JsonSchema::object()
                .required_property(
                    "kind",
                    JsonSchema::string()
                        .one_of(ResourceKind::ALL.map(ResourceKind::as_str))
                        .describe("The kind of resource to list."),
                )
                .property(
                    "namespace",
                    JsonSchema::string().describe("Namespace to list from. Ignored for Node and Namespace. If empty, lists from all namespaces."),
                )
                .property(
                    "name_filter",
                    JsonSchema::string().describe("Case-insensitive substring the resource name must contain."),
                ),
        )
    }

    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> CoreResult<String> {
        let args: Args = parse_arguments(arguments)?;
        let listing = async {
            let kind: ResourceKind = args.kind.parse()?;
            let cluster = ClusterHandle::from_context(ctx)?;
            let namespace = non_empty(args.namespace.clone());
            let rows = rows(cluster.client(), kind, namespace.as_deref()).await?;
            Ok::<_, crate::error::ClusterError>((kind, rows))
        };
        let (kind, rows) = listing.await.map_err(|e| e.into_tool_error(NAME))?;

        let filter = non_empty(args.name_filter).map(|f| f.to_lowercase());
        let lines: Vec<String> = rows
            .into_iter()
            .filter(|(name, _)| filter.as_deref().is_none_or(|f| name.to_lowercase().contains(f)))
            .map(|(_, line)| line)
            .collect();

        tracing::debug!(tool = NAME, %kind, matched = lines.len(), "Listed resources");
        Ok(render_list(&lines, &format!("No {kind} resources found.")))
    }
}

/// `(name, display line)` per object
async fn rows(client: &dyn ClusterClient, kind: ResourceKind, namespace: Option<&str>) -> Result<Vec<(String, String)>> {
    let now = Utc::now();
    let rows = match kind {
        ResourceKind::Pod => client
            .list_pods(namespace)
            .await?
            .into_iter()
            .map(|p| {
                let line = format!(
                    "{} (Status: {}, Node: {}, Age: {})",
                    p.metadata.qualified_name(),
                    p.phase,
                    p.node_name.as_deref().unwrap_or("<none>"),
                    p.metadata.age(now)
                );
                (p.metadata.name, line)
            })
            .collect(),
        ResourceKind::Deployment => client
            .list_deployments(namespace)
            .await?
            .into_iter()
            .map(|d| {
                let line = format!(
                    "{} (Ready: {}/{}, Image: {}, Age: {})",
                    d.metadata.qualified_name(),
                    d.ready_replicas,
                    d.replicas,
                    d.image,
                    d.metadata.age(now)
                );
                (d.metadata.name, line)
            })
            .collect(),
        ResourceKind::Service => client
            .list_services(namespace)
            .await?
            .into_iter()
            .map(|s| {
                let ports: Vec<String> = s.ports.iter().map(u16::to_string).collect();
                let line = format!(
                    "{} (Type: {}, ClusterIP: {}, Ports: {})",
                    s.metadata.qualified_name(),
                    s.service_type,
                    s.cluster_ip,
                    ports.join(",")
                );
                (s.metadata.name, line)
            })
            .collect(),
        ResourceKind::Node => client
            .list_nodes()
            .await?
            .into_iter()
            .map(|n| {
                let line = format!(
                    "{} (Status: {}, Role: {}, Version: {}, Age: {})",
                    n.metadata.name,
                    if n.ready { "Ready" } else { "NotReady" },
                    if n.control_plane { "control-plane" } else { "worker" },
                    n.kubelet_version,
                    n.metadata.age(now)
                );
                (n.metadata.name, line)
            })
            .collect(),
        ResourceKind::Namespace => client
            .list_namespaces()
            .await?
            .into_iter()
            .map(|ns| (ns.clone(), ns))
            .collect(),
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svckit::test_support::demo_context;

    #[tokio::test]
    async fn test_name_filter_is_case_insensitive() {
        let (_, ctx) = demo_context();
        let out = ListResourcesTool
            .execute(&ctx, r#"{"kind":"Deployment","name_filter":"CHECK"}"#)
            .await
            .unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("shop/checkout (Ready: 0/1, Image: ghcr.io/acme/checkout:1.9.0, Age: 12d)"));
    }

    #[tokio::test]
    async fn test_nodes_and_namespaces() {
        let (_, ctx) = demo_context();
        let nodes = ListResourcesTool.execute(&ctx, r#"{"kind":"nodes"}"#).await.unwrap();
        assert!(nodes.contains("worker-2 (Status: NotReady, Role: worker"));
        assert!(nodes.contains("cp-1 (Status: Ready, Role: control-plane"));

        let namespaces = ListResourcesTool
            .execute(&ctx, r#"{"kind":"Namespace","namespace":"shop"}"#)
            .await
            .unwrap();
        assert_eq!(namespaces, "default\nkube-system\nshop");
    }

    #[tokio::test]
    async fn test_services_in_namespace() {
        let (_, ctx) = demo_context();
        let out = ListResourcesTool
            .execute(&ctx, r#"{"kind":"svc","namespace":"shop"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "shop/checkout (Type: ClusterIP, ClusterIP: 10.96.12.41, Ports: 8080)\n\
             shop/web (Type: LoadBalancer, ClusterIP: 10.96.12.40, Ports: 80,443)"
        );
    }

    #[tokio::test]
    async fn test_no_match() {
        let (_, ctx) = demo_context();
        let out = ListResourcesTool
            .execute(&ctx, r#"{"kind":"Pod","name_filter":"zzz"}"#)
            .await
            .unwrap();
        assert_eq!(out, "No Pod resources found.");
    }
}
