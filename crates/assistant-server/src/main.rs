//! Kubernetes Assistant HTTP Server
//!
//! Axum-based server exposing the assistant's chat turn as Server-Sent
//! Events, plus session history and model listing.
//!
//! User identity (`x-user-id`) and cluster selection (`x-cluster`) arrive
//! as request headers, set by the dashboard's auth layer in front of this
//! service.

mod config;
mod handlers;
mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assistant_core::{AgentConfig, MemorySessionStore, ToolRegistry};
use assistant_runtime::ProviderCache;
use cluster_tools::{ClusterClient, FixtureCluster, KUBE_ASSISTANT_PROMPT};

use crate::config::ServerConfig;
use crate::handlers::{chat, get_session, health_check, list_models, list_sessions};
use crate::state::AppState;

fn app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/ai/models", get(list_models))
        // Assistant API
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/sessions", get(list_sessions))
        .route("/api/ai/sessions/{id}", get(get_session))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        provider = %config.provider.kind,
        model = %config.provider.default_model,
        allowed = config.provider.allowed_models.len(),
        "✓ AI provider configured"
    );

    // Initialize tools
    let mut tools = ToolRegistry::new();
    cluster_tools::register_all(&mut tools)?;
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Clusters
    let mut clusters: BTreeMap<String, Arc<dyn ClusterClient>> = BTreeMap::new();
    if config.demo_cluster {
        let demo = FixtureCluster::demo();
        tracing::info!("✓ Demo cluster '{}' registered", demo.name());
        clusters.insert(demo.name().to_string(), Arc::new(demo));
    } else {
        tracing::warn!("⚠ No clusters registered - tools will report a missing cluster context");
        tracing::warn!("  Set ASSISTANT_DEMO_CLUSTER=true to try the assistant against a demo cluster");
    }

    // Build application state
    let state = AppState {
        provider_config: Arc::new(config.provider),
        providers: Arc::new(ProviderCache::new()),
        tools: Arc::new(tools),
        store: Arc::new(MemorySessionStore::new()),
        clusters: Arc::new(clusters),
        agent_config: AgentConfig {
            system_prompt: KUBE_ASSISTANT_PROMPT.into(),
            max_iterations: config.max_iterations,
            ..AgentConfig::default()
        },
    };

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 assistant server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  GET  /api/ai/models         - List available models");
    tracing::info!("  POST /api/ai/chat           - Chat turn (SSE)");
    tracing::info!("  GET  /api/ai/sessions       - List sessions");
    tracing::info!("  GET  /api/ai/sessions/{{id}}  - Session history");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
