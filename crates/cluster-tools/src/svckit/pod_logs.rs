//! Pod Logs Tool

use async_trait::async_trait;
use serde::Deserialize;

use assistant_core::{
    JsonSchema, Result as CoreResult, Tool, ToolContext, ToolSchema,
    tool::parse_arguments,
};

use super::{cluster, non_empty};

const NAME: &str = "get_pod_logs";
const DEFAULT_LINES: i64 = 50;
const MAX_LINES: i64 = 100;

/// Tool for reading the tail of a pod's logs
pub struct GetPodLogsTool;

#[derive(Debug, Deserialize)]
struct Args {
    namespace: String,
    pod_name: String,

    #[serde(default)]
    container: Option<String>,

    #[serde(default)]
    lines: Option<i64>,
}

/// Non-positive means default; anything above the cap is clamped
fn tail_lines(requested: Option<i64>) -> usize {
    let lines = match requested {
        Some(n) if n > 0 => n.min(MAX_LINES),
        _ => DEFAULT_LINES,
    };
    usize::try_from(lines).unwrap_or(50)
}

#[async_trait]
impl Tool for GetPodLogsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            NAME,
            "Get logs from a specific pod",
            JsonSchema::object()
                .required_property("namespace", JsonSchema::string().describe("The namespace of the pod."))
                .required_property("pod_name", JsonSchema::string().describe("The name of the pod."))
                .property("container", JsonSchema::string().describe("Optional container name."))
                .property(
                    "lines",
                    JsonSchema::integer().describe("Number of lines to retrieve (max 100). Defaults to 50."),
                ),
        )
    }

    async fn execute(&self, ctx: &ToolContext, arguments: &str) -> CoreResult<String> {
        let args: Args = parse_arguments(arguments)?;
        let lines = tail_lines(args.lines);

        let cluster = cluster(ctx, NAME)?;
        let logs = cluster
            .client()
            .pod_logs(&args.namespace, &args.pod_name, non_empty(args.container).as_deref(), lines)
            .await
            .map_err(|e| e.into_tool_error(NAME))?;

        tracing::debug!(tool = NAME, pod = %args.pod_name, lines, "Fetched pod logs");
        if logs.is_empty() {
            return Ok(format!("No log output for pod {}/{}.", args.namespace, args.pod_name));
        }
        Ok(logs)
    }
}
