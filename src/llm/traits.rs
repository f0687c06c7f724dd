use super::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;

/// Narrow boundary to the language-model provider: one non-streaming call.
///
/// The loop controller treats the provider as a black box. Failures here are
/// fatal to a run; retry and fallback policy belongs to the caller that built
/// the provider, not to the loop.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openrouter", "openai").
    fn name(&self) -> &str;

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;
}
