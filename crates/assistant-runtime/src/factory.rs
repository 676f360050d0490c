//! Provider selection
//!
//! Maps a resolved [`ProviderConfig`] to an adapter once per turn. The loop
//! only ever sees `Arc<dyn LlmProvider>`.

use std::sync::Arc;

use assistant_core::{
    ClientCache,
    error::Result,
    provider::{LlmProvider, ProviderConfig, ProviderKind},
};

use crate::gemini::{GeminiConfig, GeminiProvider};
use crate::ollama::{OllamaConfig, OllamaProvider};
use crate::openai::{OpenAiConfig, OpenAiProvider};

/// Cache of adapters keyed by [`ProviderConfig::cache_key`], invalidated by
/// the configuration's `updated_at`
pub type ProviderCache = ClientCache<String, Arc<dyn LlmProvider>>;

/// Build the adapter for `config`, using `model` instead of the default
pub fn create_provider(config: &ProviderConfig, model: &str) -> Result<Arc<dyn LlmProvider>> {
    config.validate()?;
    tracing::info!(provider = %config.kind, model, "Creating AI provider");

    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::OpenAi => {
            let defaults = OpenAiConfig::default();
            Arc::new(OpenAiProvider::from_config(OpenAiConfig {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone().unwrap_or(defaults.base_url),
                model: model.to_string(),
                timeout_secs: config.timeout_secs,
            })?)
        }
        ProviderKind::Gemini => {
            let defaults = GeminiConfig::default();
            Arc::new(GeminiProvider::from_config(GeminiConfig {
                api_key: config.api_key.clone(),
                base_url: config.base_url.clone().unwrap_or(defaults.base_url),
                model: model.to_string(),
                timeout_secs: config.timeout_secs,
            })?)
        }
        ProviderKind::Ollama => {
            let mut ollama = OllamaConfig {
                model: model.to_string(),
                timeout_secs: config.timeout_secs,
                ..OllamaConfig::default()
            };
            if let Some(base_url) = &config.base_url {
                ollama = ollama.with_base_url(base_url);
            }
            Arc::new(OllamaProvider::from_config(ollama)?)
        }
    };
    Ok(provider)
}

/// Resolve the turn's model and return a cached or freshly built adapter
pub async fn provider_for_turn(
    cache: &ProviderCache,
    config: &ProviderConfig,
    requested_model: Option<&str>,
) -> Result<Arc<dyn LlmProvider>> {
    let model = config.resolve_model(requested_model);
    cache
        .get_or_try_insert(&config.cache_key(&model), &config.updated_at, || {
            create_provider(config, &model)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::AgentError;
    use assistant_core::provider::SystemPromptMode;

    #[test]
    fn test_factory_picks_adapter_by_kind() {
        let gemini = create_provider(
            &ProviderConfig::new(ProviderKind::Gemini, "key", "gemini-1.5-flash"),
            "gemini-1.5-pro",
        )
        .unwrap();
        let caps = gemini.capabilities();
        assert_eq!(caps.name, "Gemini");
        assert_eq!(caps.system_prompt, SystemPromptMode::Instruction);
        assert!(!caps.issues_call_ids);
        assert_eq!(gemini.model(), "gemini-1.5-pro");

        let ollama = create_provider(&ProviderConfig::new(ProviderKind::Ollama, "", "llama3.2"), "llama3.2").unwrap();
        assert_eq!(ollama.capabilities().name, "Ollama");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = create_provider(&ProviderConfig::new(ProviderKind::OpenAi, "", "gpt-4o-mini"), "gpt-4o-mini");
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[tokio::test]
    async fn test_cache_rebuilds_on_config_change() {
        let cache = ProviderCache::new();
        let mut config = ProviderConfig::new(ProviderKind::OpenAi, "sk", "gpt-4o-mini");
        config.allowed_models = vec!["gpt-4o-mini".into(), "gpt-4o".into()];

        let a = provider_for_turn(&cache, &config, None).await.unwrap();
        let b = provider_for_turn(&cache, &config, Some("o1")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = provider_for_turn(&cache, &config, Some("gpt-4o")).await.unwrap();
        assert_eq!(c.model(), "gpt-4o");
        assert_eq!(cache.len().await, 2);

        config.updated_at += chrono::Duration::seconds(1);
        let d = provider_for_turn(&cache, &config, None).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &d));
    }

    #[tokio::test]
    async fn test_cache_keeps_api_keys_apart() {
        let cache = ProviderCache::new();
        let alice = ProviderConfig::new(ProviderKind::OpenAi, "sk-alice", "gpt-4o-mini");
        let bob = ProviderConfig {
            api_key: "sk-bob".into(),
            ..alice.clone()
        };

        let a = provider_for_turn(&cache, &alice, None).await.unwrap();
        let b = provider_for_turn(&cache, &bob, None).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len().await, 2);

        let again = provider_for_turn(&cache, &alice, None).await.unwrap();
        assert!(Arc::ptr_eq(&a, &again));
    }
}
