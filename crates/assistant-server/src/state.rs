//! Application State

use std::collections::BTreeMap;
use std::sync::Arc;

use assistant_core::{
    Agent, AgentConfig, ProviderConfig, Result, SessionStore, ToolContext, ToolRegistry,
};
use assistant_runtime::{ProviderCache, provider_for_turn};
use cluster_tools::{ClusterClient, ClusterHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Active provider configuration
    pub provider_config: Arc<ProviderConfig>,

    /// Adapters built so far, per model
    pub providers: Arc<ProviderCache>,

    /// Tool registry with all available tools
    pub tools: Arc<ToolRegistry>,

    /// Session persistence
    pub store: Arc<dyn SessionStore>,

    /// Clusters selectable through the `x-cluster` header, by name
    pub clusters: Arc<BTreeMap<String, Arc<dyn ClusterClient>>>,

    /// Loop settings applied to every turn
    pub agent_config: AgentConfig,
}

impl AppState {
    /// Build the agent for one turn, reusing a cached adapter when possible
    pub async fn agent_for_turn(&self, requested_model: Option<&str>) -> Result<Agent> {
        let provider = provider_for_turn(&self.providers, &self.provider_config, requested_model).await?;
        Agent::builder()
            .provider(provider)
            .tools(self.tools.clone())
            .store(self.store.clone())
            .config(self.agent_config.clone())
            .build()
    }

    /// Tool context for a request, bound to the named cluster if it exists
    pub fn tool_context(&self, cluster: Option<&str>) -> Option<ToolContext> {
        match cluster {
            None => Some(ToolContext::new()),
            Some(name) => self
                .clusters
                .get(name)
                .map(|client| ClusterHandle::new(client.clone()).attach(ToolContext::new())),
        }
    }

    pub fn cluster_names(&self) -> Vec<&str> {
        self.clusters.keys().map(String::as_str).collect()
    }
}
