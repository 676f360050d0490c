//! Server Configuration
//!
//! Read from environment variables (a `.env` file is loaded first by
//! `main`):
//!
//! | variable                 | default                 |
//! |--------------------------|-------------------------|
//! | `BIND_ADDR`              | `0.0.0.0:3000`          |
//! | `AI_PROVIDER`            | `ollama`                |
//! | `AI_API_KEY`             | empty                   |
//! | `AI_BASE_URL`            | provider default        |
//! | `AI_MODEL`               | provider default        |
//! | `AI_ALLOWED_MODELS`      | any (comma separated)   |
//! | `AI_TIMEOUT_SECS`        | `120`                   |
//! | `AI_MAX_ITERATIONS`      | `5`                     |
//! | `ASSISTANT_DEMO_CLUSTER` | `false`                 |

use assistant_core::{AgentError, ProviderConfig, ProviderKind, Result, reasoning::DEFAULT_MAX_ITERATIONS};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub provider: ProviderConfig,
    pub max_iterations: usize,

    /// Register the in-memory demo cluster
    pub demo_cluster: bool,
}

const fn default_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "gpt-4o-mini",
        ProviderKind::Gemini => "gemini-1.5-flash",
        ProviderKind::Ollama => "llama3.2",
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("{name} must be a number, got {v:?}"))),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let set = |name: &str| var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let kind: ProviderKind = set("AI_PROVIDER").as_deref().unwrap_or("ollama").parse()?;
        let model = set("AI_MODEL").unwrap_or_else(|| default_model(kind).to_string());

        let mut provider = ProviderConfig::new(kind, set("AI_API_KEY").unwrap_or_default(), model);
        provider.base_url = set("AI_BASE_URL");
        provider.allowed_models = set("AI_ALLOWED_MODELS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        provider.timeout_secs = parse_number("AI_TIMEOUT_SECS", var("AI_TIMEOUT_SECS"), provider.timeout_secs)?;
        provider.validate()?;

        let max_iterations = parse_number("AI_MAX_ITERATIONS", var("AI_MAX_ITERATIONS"), DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(AgentError::Config("AI_MAX_ITERATIONS must be at least 1".into()));
        }

        Ok(Self {
            bind_addr: set("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            provider,
            max_iterations,
            demo_cluster: parse_flag(var("ASSISTANT_DEMO_CLUSTER")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_to_local_ollama() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.provider.kind, ProviderKind::Ollama);
        assert_eq!(cfg.provider.default_model, "llama3.2");
        assert_eq!(cfg.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert!(!cfg.demo_cluster);
    }

    #[test]
    fn test_gemini_with_allowed_models() {
        let cfg = config(&[
            ("AI_PROVIDER", "gemini"),
            ("AI_API_KEY", "g-key"),
            ("AI_ALLOWED_MODELS", "gemini-1.5-flash, gemini-1.5-pro,,"),
            ("AI_TIMEOUT_SECS", "30"),
            ("ASSISTANT_DEMO_CLUSTER", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.provider.default_model, "gemini-1.5-flash");
        assert_eq!(cfg.provider.allowed_models, vec!["gemini-1.5-flash", "gemini-1.5-pro"]);
        assert_eq!(cfg.provider.timeout_secs, 30);
        assert!(cfg.demo_cluster);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(config(&[("AI_PROVIDER", "openai")]), Err(AgentError::Config(_))));
        assert!(matches!(config(&[("AI_PROVIDER", "claude")]), Err(AgentError::Config(_))));
        assert!(matches!(config(&[("AI_TIMEOUT_SECS", "soon")]), Err(AgentError::Config(_))));
        assert!(matches!(config(&[("AI_MAX_ITERATIONS", "0")]), Err(AgentError::Config(_))));
    }
}
