use super::AppState;
use super::sse::stream_events;
use crate::engine::{EngineEvent, RunParams};
use crate::llm::{ChatMessage, ChatRequest};
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub agent: String,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Extracted text of a document the tools may search, if any.
    #[serde(default)]
    pub document_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub slug: String,
    pub name: String,
    pub tools: Vec<String>,
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// `POST /api/agent/run` — stream one agent run as Server-Sent Events.
pub async fn handle_run(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Response<Body>, (StatusCode, Json<ErrorResponse>)> {
    if payload.message.trim().is_empty() {
        return Err(bad_request("message cannot be empty"));
    }

    let Some(agent) = state.config.find_agent(&payload.agent) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown agent: {}", payload.agent),
            }),
        ));
    };

    info!(agent = %agent.slug, tools = agent.tools.len(), "received run request");

    let model = agent
        .model
        .clone()
        .unwrap_or_else(|| state.config.provider.model.clone());
    let temperature = agent
        .temperature
        .unwrap_or(state.config.provider.temperature);

    // An agent with no tools never enters the engine: one provider call,
    // streamed through the same frame types.
    if agent.tools.is_empty() {
        let rx = single_shot(&state, agent.system_prompt.clone(), &payload, model, temperature);
        return Ok(stream_events(rx));
    }

    let rx = state.engine.run(RunParams {
        agent_id: agent.id(),
        agent_slug: agent.slug.clone(),
        system_prompt: agent.system_prompt.clone(),
        user_message: payload.message,
        history: payload.history,
        allowed_tools: agent.tools.clone(),
        document_text: payload.document_text,
        model,
        temperature,
    });
    Ok(stream_events(rx))
}

fn single_shot(
    state: &AppState,
    system_prompt: String,
    payload: &RunRequest,
    model: String,
    temperature: f64,
) -> mpsc::Receiver<EngineEvent> {
    let (tx, rx) = mpsc::channel(4);
    let provider = state.provider.clone();
    let mut messages = vec![ChatMessage::system(system_prompt)];
    messages.extend(payload.history.iter().cloned());
    messages.push(ChatMessage::user(&payload.message));

    tokio::spawn(async move {
        let request = ChatRequest {
            messages,
            model: model.clone(),
            temperature,
        };
        match provider.chat(&request).await {
            Ok(response) => {
                let _ = tx
                    .send(EngineEvent::Token {
                        content: response.text,
                    })
                    .await;
                let _ = tx
                    .send(EngineEvent::Done {
                        provider: provider.name().to_string(),
                        model: response.model.unwrap_or(model),
                    })
                    .await;
            }
            Err(err) => {
                error!(error = %err, "single-shot provider call failed");
                let _ = tx
                    .send(EngineEvent::Error {
                        message: err.to_string(),
                    })
                    .await;
                let _ = tx
                    .send(EngineEvent::Done {
                        provider: provider.name().to_string(),
                        model,
                    })
                    .await;
            }
        }
    });
    rx
}

/// `GET /api/agents` — the configured agents and their allow-lists.
pub async fn handle_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    Json(
        state
            .config
            .agents
            .iter()
            .map(|agent| AgentSummary {
                slug: agent.slug.clone(),
                name: agent.name.clone(),
                tools: agent.tools.clone(),
            })
            .collect(),
    )
}

/// `GET /health`
pub async fn handle_health() -> &'static str {
    "OK"
}
