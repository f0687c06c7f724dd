//! OpenAI-compatible `/chat/completions` client.
//!
//! Works against any endpoint that speaks the OpenAI chat-completions wire
//! format (OpenRouter, OpenAI, vLLM, llama.cpp server). The per-call timeout
//! configured here is the only timeout mechanism in the system; the loop
//! controller imposes a count budget, not a wall-clock budget.

use super::traits::Provider;
use super::types::{ChatMessage, ChatRequest, ChatResponse, ChatRole};
use crate::error::LlmError;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct CompatibleProvider {
    name: String,
    url: String,
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    timeout_secs: u64,
    client: Client,
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: String,
}

// ── Implementation ───────────────────────────────────────────────────────────

impl CompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            name: name.into(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            timeout_secs,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    fn wire_role(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    fn build_wire_request(request: &ChatRequest) -> WireRequest {
        WireRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m: &ChatMessage| WireMessage {
                    role: Self::wire_role(m.role),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl Provider for CompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let wire = Self::build_wire_request(request);

        let mut http_request = self.client.post(&self.url).json(&wire);
        if let Some(auth_header) = self.cached_auth_header.as_ref() {
            http_request = http_request.header("Authorization", auth_header);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::Error::from(LlmError::Timeout {
                    provider: self.name.clone(),
                    timeout_secs: self.timeout_secs,
                })
            } else {
                anyhow::Error::from(LlmError::Request {
                    provider: self.name.clone(),
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::Auth {
                provider: self.name.clone(),
            }
            .into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Request {
                provider: self.name.clone(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let parsed: WireResponse = response
            .json()
            .await
            .with_context(|| format!("decoding {} chat response", self.name))?;

        let text = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: self.name.clone(),
            })?;

        let mut chat_response = ChatResponse::text_only(text);
        if let Some(model) = parsed.model {
            chat_response = chat_response.with_model(model);
        }
        Ok(chat_response)
    }
}
