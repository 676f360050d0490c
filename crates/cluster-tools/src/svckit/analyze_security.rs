//! Analyze Security Tool
//!
//! Basic posture scan of one Pod or Deployment: privileged containers,
//! containers allowed to run as root, containers without a security
//! context, and use of the host network or PID namespace.

use async_trait::async_trait;
use serde::Deserialize;

use assistant_core::{
    JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema,
    tool::parse_arguments,
};

use crate::cluster::ClusterHandle;
use crate::error::{ClusterError, Result};
use crate::model::{ResourceKind, SecurityContext};

const NAME: &str = "analyze_security";

/// Result text when no rule matched
pub const NO_FINDINGS: &str = "No obvious security issues found in basic scan.";

pub struct AnalyzeSecurityTool;

#[derive(Debug, Deserialize)]
struct Args {
    namespace: String,
    kind: String,
    name: String,
}

/// The parts of a pod spec the scan looks at
struct PodSecurity {
    containers: Vec<(String, Option<SecurityContext>)>,
    host_network: bool,
    host_pid: bool,
}

impl PodSecurity {
    fn findings(&self) -> Vec<String> {
        let mut findings = Vec::new();
        for (name, context) in &self.containers {
            match context {
                Some(sc) => {
                    if sc.privileged == Some(true) {
                        findings.push(format!("Container '{name}' is running as Privileged."));
                    }
                    if sc.run_as_non_root == Some(false) {
                        findings.push(format!("Container '{name}' allows running as root."));
                    }
                }
                None => findings.push(format!("Container '{name}' has no SecurityContext defined.")),
            }
        }
        if self.host_network {
            findings.push("Pod is using HostNetwork.".into());
        }
        if self.host_pid {
            findings.push("Pod is using HostPID.".into());
        }
        findings
    }
}

#[async_trait]
impl Tool for AnalyzeSecurityTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Analyze the security context of a specific resource (Pod or Deployment) and report potential issues. If you don't know the specific pod or namespace, find them first using 'list_pods' or 'list_resources'.",
            JsonSchema::object()
                .required_property("namespace", JsonSchema::string().describe("The namespace of the resource."))
                .required_property(
                    "kind",
                    JsonSchema::string()
                        .one_of(["Pod", "Deployment"])
                        .describe("The kind of resource."),
                )
                .required_property("name", JsonSchema::string().describe("The name of the resource.")),
        )
    }

    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> CoreResult<String> {
        let args: Args = parse_arguments(arguments)?;
        analyze(ctx, &args).await.map_err(|e| e.into_tool_error(NAME))
    }
}

async fn analyze(ctx: &ToolContext, args: &Args) -> Result<String> {
    let kind: ResourceKind = args.kind.parse()?;
    if !matches!(kind, ResourceKind::Pod | ResourceKind::Deployment) {
        return Err(ClusterError::InvalidArgument(format!(
            "security analysis supports Pod and Deployment, got {kind}"
        )));
    }
    let cluster = ClusterHandle::from_context(ctx)?;
    let client = cluster.client();
    let qualified = format!("{}/{}", args.namespace, args.name);

    let spec = if kind == ResourceKind::Pod {
        let pod = client
            .list_pods(Some(&args.namespace))
            .await?
            .into_iter()
            .find(|p| p.metadata.name == args.name)
            .ok_or_else(|| ClusterError::not_found(kind, qualified))?;
        PodSecurity {
            containers: pod
                .containers
                .into_iter()
                .map(|c| (c.name, c.security_context))
                .collect(),
            host_network: pod.host_network,
            host_pid: pod.host_pid,
        }
    } else {
        let deployment = client
            .list_deployments(Some(&args.namespace))
            .await?
            .into_iter()
            .find(|d| d.metadata.name == args.name)
            .ok_or_else(|| ClusterError::not_found(kind, qualified))?;
        PodSecurity {
            containers: vec![(deployment.metadata.name, deployment.security_context)],
            host_network: deployment.host_network,
            host_pid: deployment.host_pid,
        }
    };

    let findings = spec.findings();
    tracing::debug!(kind = %kind, resource = %args.name, findings = findings.len(), "Security scan");
    if findings.is_empty() {
        return Ok(NO_FINDINGS.into());
    }
    Ok(format!("Security Analysis Findings:\n- {}", findings.join("\n- ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pod, PodPhase};
    use crate::svckit::test_support::demo_context;
    use assistant_core::AgentError;

    async fn scan(arguments: &str) -> CoreResult<String> {
        let (_, ctx) = demo_context();
        AnalyzeSecurityTool.execute(&ctx, arguments).await
    }

    #[tokio::test]
    async fn test_restricted_workload_is_clean() {
        let out = scan(r#"{"namespace":"shop","kind":"Deployment","name":"web"}"#).await.unwrap();
        assert_eq!(out, NO_FINDINGS);
    }

    #[tokio::test]
    async fn test_reports_root_and_missing_context() {
        let out = scan(r#"{"namespace":"shop","kind":"Pod","name":"checkout-5c4b9d7f6-xyz12"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "Security Analysis Findings:\n- Container 'checkout' allows running as root."
        );

        let out = scan(r#"{"namespace":"shop","kind":"deploy","name":"cart"}"#).await.unwrap();
        assert!(out.contains("Container 'cart' has no SecurityContext defined."));
    }

    #[tokio::test]
    async fn test_reports_privileged_and_host_namespaces() {
        let (cluster, ctx) = demo_context();
        cluster
            .add_pod(
                Pod::new("ops", "node-agent", PodPhase::Running)
                    .container("agent", "ghcr.io/acme/agent:1", 0)
                    .container("shipper", "ghcr.io/acme/shipper:1", 0)
                    .secured(SecurityContext {
                        privileged: Some(true),
                        run_as_non_root: Some(false),
                    })
                    .host_namespaces(true, true),
            )
            .await;

        let out = AnalyzeSecurityTool
            .execute(&ctx, r#"{"namespace":"ops","kind":"Pod","name":"node-agent"}"#)
            .await
            .unwrap();
        let findings: Vec<_> = out.lines().skip(1).collect();
        assert_eq!(
            findings,
            vec![
                "- Container 'agent' is running as Privileged.",
                "- Container 'agent' allows running as root.",
                "- Container 'shipper' is running as Privileged.",
                "- Container 'shipper' allows running as root.",
                "- Pod is using HostNetwork.",
                "- Pod is using HostPID.",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejects_other_kinds_and_unknown_names() {
        let err = scan(r#"{"namespace":"shop","kind":"Service","name":"web"}"#).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));

        let err = scan(r#"{"namespace":"shop","kind":"Pod","name":"ghost"}"#).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tool 'analyze_security' failed: Pod shop/ghost not found"
        );
    }

    #[tokio::test]
    async fn test_requires_cluster() {
        let err = AnalyzeSecurityTool
            .execute(&ToolContext::new(), r#"{"namespace":"shop","kind":"Pod","name":"x"}"#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("kubernetes client not found in context"));
    }
}
