//! Shared test harness: a scripted provider and event-stream helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use kredo::engine::{EngineEvent, RunParams, StepEvent};
use kredo::llm::{ChatRequest, ChatResponse, Provider};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum Scripted {
    Text(String),
    Failure(String),
}

pub struct MockProvider {
    script: Mutex<VecDeque<Scripted>>,
    seen_requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from(script)),
            seen_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn seen_requests(&self) -> Vec<ChatRequest> {
        self.seen_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        self.seen_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Scripted::Text(text)) => Ok(ChatResponse::text_only(text).with_model("mock-model")),
            Some(Scripted::Failure(message)) => anyhow::bail!(message),
            None => Ok(ChatResponse::text_only("(script exhausted)")),
        }
    }
}

pub fn text(content: &str) -> Scripted {
    Scripted::Text(content.to_string())
}

pub fn failure(message: &str) -> Scripted {
    Scripted::Failure(message.to_string())
}

/// A model turn requesting one tool call through the sentinel protocol.
pub fn tool_call(tool: &str, params: Value) -> Scripted {
    Scripted::Text(format!(
        "|||TOOL_CALL|||{{\"tool\":\"{tool}\",\"params\":{params}}}|||END_TOOL_CALL|||"
    ))
}

/// Drain the run's event stream to completion.
pub async fn collect_events(mut rx: mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn step_events(events: &[EngineEvent]) -> Vec<&StepEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Step { data } => Some(data),
            _ => None,
        })
        .collect()
}

pub fn token_contents(events: &[EngineEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Token { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// Baseline run parameters for an advisory agent with the given allow-list.
pub fn run_params(allowed_tools: &[&str], message: &str) -> RunParams {
    RunParams {
        agent_id: "agent:advisor".to_string(),
        agent_slug: "advisor".to_string(),
        system_prompt: "You are an advisory assistant.".to_string(),
        user_message: message.to_string(),
        history: Vec::new(),
        allowed_tools: allowed_tools.iter().map(|t| (*t).to_string()).collect(),
        document_text: None,
        model: "mock-model".to_string(),
        temperature: 0.0,
    }
}
