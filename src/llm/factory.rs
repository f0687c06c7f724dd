use super::compatible::CompatibleProvider;
use super::traits::Provider;
use crate::config::ProviderConfig;
use std::sync::Arc;

/// Resolve an API key from config and environment variables.
///
/// Resolution order:
/// 1. Explicitly configured `api_key` (trimmed, filtered if empty)
/// 2. Provider-specific environment variable (e.g. `OPENROUTER_API_KEY`)
/// 3. Generic fallbacks (`KREDO_API_KEY`, `API_KEY`)
pub fn resolve_api_key(name: &str, explicit_api_key: Option<&str>) -> Option<String> {
    if let Some(key) = explicit_api_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let provider_env_candidates: Vec<&str> = match name {
        "openrouter" => vec!["OPENROUTER_API_KEY"],
        "openai" => vec!["OPENAI_API_KEY"],
        "groq" => vec!["GROQ_API_KEY"],
        "mistral" => vec!["MISTRAL_API_KEY"],
        "deepseek" => vec!["DEEPSEEK_API_KEY"],
        _ => vec![],
    };

    for env_var in provider_env_candidates {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    for env_var in ["KREDO_API_KEY", "API_KEY"] {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Build the provider client described by config.
///
/// Every supported provider speaks the OpenAI-compatible chat-completions
/// format; they differ only in endpoint and credential source.
pub fn build_provider(config: &ProviderConfig) -> Arc<dyn Provider> {
    let api_key = resolve_api_key(&config.kind, config.api_key.as_deref());
    Arc::new(CompatibleProvider::new(
        config.kind.clone(),
        &config.base_url,
        api_key.as_deref(),
        config.timeout_secs,
    ))
}
