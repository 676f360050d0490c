//! Scale Deployment Tool
//!
//! The only mutating tool. Nothing changes until the model repeats the
//! call with `confirm: true`, which it is told to do only after the user
//! agrees.

use async_trait::async_trait;
use serde::Deserialize;

use assistant_core::{
    JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema,
    tool::parse_arguments,
};

use super::cluster;
use crate::error::ClusterError;

const NAME: &str = "scale_deployment";

/// Upper bound on replicas a single call may request
pub const MAX_REPLICAS: u32 = 100;

pub struct ScaleDeploymentTool;

#[derive(Debug, Deserialize)]
struct Args {
    namespace: String,
    name: String,
    replicas: i64,

    #[serde(default)]
    confirm: bool,
}

impl Args {
    fn replicas(&self) -> Result<u32, ClusterError> {
        u32::try_from(self.replicas)
            .ok()
            .filter(|r| *r <= MAX_REPLICAS)
            .ok_or_else(|| {
                ClusterError::InvalidArgument(format!(
                    "replicas must be between 0 and {MAX_REPLICAS}, got {}",
                    self.replicas
                ))
            })
    }
}

#[async_trait]
impl Tool for ScaleDeploymentTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Scale a deployment to a number of replicas. This changes the cluster: first call without 'confirm' to get a summary, show it to the user, and only call again with confirm=true once they agree.",
            JsonSchema::object()
                .required_property("namespace", JsonSchema::string().describe("The namespace of the deployment."))
                .required_property("name", JsonSchema::string().describe("The name of the deployment."))
                .required_property("replicas", JsonSchema::integer().describe("Desired number of replicas."))
                .property(
                    "confirm",
                    JsonSchema::boolean().describe("Set to true only after the user explicitly confirmed the change."),
                ),
        )
    }

    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> CoreResult<String> {
        let args: Args = parse_arguments(arguments)?;
        let replicas = args.replicas().map_err(|e| e.into_tool_error(NAME))?;
        let cluster = cluster(ctx, NAME)?;
        let client = cluster.client();

        let current = client
            .list_deployments(Some(&args.namespace))
            .await
            .map_err(|e| e.into_tool_error(NAME))?
            .into_iter()
            .find(|d| d.metadata.name == args.name)
            .ok_or_else(|| {
                ClusterError::not_found("Deployment", format!("{}/{}", args.namespace, args.name)).into_tool_error(NAME)
            })?;

        if current.replicas == replicas {
            return Ok(format!(
                "Deployment {}/{} already has {replicas} replicas. Nothing to do.",
                args.namespace, args.name
            ));
        }

        if !args.confirm {
            return Ok(format!(
                "Confirmation required: scaling deployment {}/{} from {} to {replicas} replicas. \
                 Ask the user to confirm, then call {NAME} again with confirm=true.",
                args.namespace, args.name, current.replicas
            ));
        }

        let updated = client
            .scale_deployment(&args.namespace, &args.name, replicas)
            .await
            .map_err(|e| e.into_tool_error(NAME))?;

        tracing::info!(
            tool = NAME,
            cluster = ctx.target_name().unwrap_or_default(),
            user = ctx.user_id.as_deref().unwrap_or_default(),
            deployment = %updated.metadata.qualified_name(),
            from = current.replicas,
            to = updated.replicas,
            "Deployment scaled"
        );
        Ok(format!(
            "Scaled deployment {} from {} to {} replicas.",
            updated.metadata.qualified_name(),
            current.replicas,
            updated.replicas
        ))
    }
}
