//! The conversation loop controller.
//!
//! Drives iterations of: call model, decode tool call, validate against the
//! registry and allow-list, execute the tool or treat the text as the final
//! answer, append results to the conversation, repeat — bounded by a fixed
//! iteration count with a forced-completion fallback. Every transition is
//! pushed to the event channel as it happens; the consumer dropping its end
//! stops the run at the next emission.

use super::events::{EngineEvent, MAX_STRING_CHARS, StepEvent, StepStatus, StepType, truncate_chars};
use super::prompt::{
    FALLBACK_ANSWER, FORCED_FINAL_INSTRUCTION, build_system_prompt, corrective_message,
};
use super::protocol::{self, ModelTurn, ToolCall};
use crate::llm::{ChatMessage, ChatRequest, Provider};
use crate::tools::{RuntimeContext, Tool, ToolRegistry, ToolResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ── Constants ────────────────────────────────────────────────────────────────

/// Default model-call budget per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 6;

/// Absolute upper bound on the iteration budget, regardless of caller request.
pub(crate) const MAX_ITERATIONS_HARD_CAP: u32 = 12;

const EVENT_CHANNEL_CAPACITY: usize = 32;

// ── Public types ─────────────────────────────────────────────────────────────

/// Orchestrates one bounded tool-use conversation per [`Engine::run`] call.
/// Cheap to clone; runs share only the provider and the read-only registry.
#[derive(Clone)]
pub struct Engine {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    max_iterations: u32,
}

/// Parameters for a single run.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub agent_id: String,
    pub agent_slug: String,
    pub system_prompt: String,
    pub user_message: String,
    pub history: Vec<ChatMessage>,
    /// The subset of registry tools this agent may use.
    pub allowed_tools: Vec<String>,
    pub document_text: Option<String>,
    pub model: String,
    pub temperature: f64,
}

// ── Internal types ───────────────────────────────────────────────────────────

/// Per-run mutable state, exclusively owned by the driving task and destroyed
/// when the run ends.
struct RunState {
    messages: Vec<ChatMessage>,
    steps: Vec<StepEvent>,
    step_counter: u32,
    iteration: u32,
}

impl RunState {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            steps: Vec::new(),
            step_counter: 0,
            iteration: 0,
        }
    }

    fn next_step(&mut self) -> u32 {
        self.step_counter += 1;
        self.step_counter
    }
}

/// Push side of the event channel. `send` reports whether the consumer is
/// still attached; a detached consumer stops the run at the next emission.
struct EventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventSink {
    async fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// How the main loop ended.
enum LoopOutcome {
    /// The model produced a final answer within budget.
    Answered,
    /// The iteration budget ran out; the forced-final path takes over.
    Exhausted,
    /// A model call failed; fatal to the run.
    Failed(String),
    /// The consumer dropped its end of the channel; stop silently.
    Detached,
}

// ── Implementation ───────────────────────────────────────────────────────────

impl Engine {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>, max_iterations: u32) -> Self {
        Self {
            provider,
            registry,
            max_iterations: max_iterations.clamp(1, MAX_ITERATIONS_HARD_CAP),
        }
    }

    /// Start a run and return the consumer end of its event stream.
    ///
    /// The run executes in a spawned task; events arrive in emission order
    /// and the channel closes after the terminal `done` frame.
    pub fn run(&self, params: RunParams) -> mpsc::Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let engine = self.clone();
        tokio::spawn(async move {
            engine.drive(params, EventSink { tx }).await;
        });
        rx
    }

    async fn drive(&self, params: RunParams, sink: EventSink) {
        let run_id = Uuid::new_v4();
        info!(%run_id, agent = %params.agent_slug, "engine run started");

        let specs = self.registry.specs_for_allowed(&params.allowed_tools);
        let ctx = RuntimeContext {
            agent_id: params.agent_id.clone(),
            agent_slug: params.agent_slug.clone(),
            document_text: params.document_text.clone(),
        };

        let mut state = RunState::new();
        state
            .messages
            .push(ChatMessage::system(build_system_prompt(
                &params.system_prompt,
                &specs,
            )));
        state.messages.extend(params.history.iter().cloned());
        state.messages.push(ChatMessage::user(&params.user_message));

        let mut model_used = params.model.clone();

        let outcome = self
            .run_loop(&params, &ctx, &mut state, &sink, &mut model_used)
            .await;

        match outcome {
            LoopOutcome::Answered => {}
            LoopOutcome::Exhausted => {
                if !self
                    .forced_final(&params, &mut state, &sink, &mut model_used)
                    .await
                {
                    debug!(%run_id, "consumer detached during forced final");
                    return;
                }
            }
            LoopOutcome::Failed(message) => {
                warn!(%run_id, error = %message, "engine run failed");
                if sink.send(EngineEvent::Error { message }).await {
                    let _ = sink
                        .send(EngineEvent::Done {
                            provider: self.provider.name().to_string(),
                            model: model_used,
                        })
                        .await;
                }
                return;
            }
            LoopOutcome::Detached => {
                debug!(%run_id, "consumer detached; run stopped");
                return;
            }
        }

        // Aggregate for downstream audit persistence, then the terminal marker.
        if !sink
            .send(EngineEvent::StepsComplete {
                steps: state.steps.clone(),
            })
            .await
        {
            return;
        }
        let _ = sink
            .send(EngineEvent::Done {
                provider: self.provider.name().to_string(),
                model: model_used,
            })
            .await;
        info!(%run_id, steps = state.step_counter, iterations = state.iteration, "engine run completed");
    }

    /// The bounded state machine: REASONING → {TOOL_EXECUTING → REASONING} |
    /// FINAL_ANSWER, until the iteration budget runs out.
    async fn run_loop(
        &self,
        params: &RunParams,
        ctx: &RuntimeContext,
        state: &mut RunState,
        sink: &EventSink,
        model_used: &mut String,
    ) -> LoopOutcome {
        let max_steps = self.max_steps();

        loop {
            if state.iteration >= self.max_iterations {
                return LoopOutcome::Exhausted;
            }
            state.iteration += 1;

            let reasoning = StepEvent::running(
                StepType::LlmReasoning,
                "Analyzing request",
                state.next_step(),
                max_steps,
            );
            if !emit_step(sink, state, reasoning.clone()).await {
                return LoopOutcome::Detached;
            }

            let started = Instant::now();
            let response = self
                .provider
                .chat(&self.chat_request(params, state))
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let response = match response {
                Ok(response) => response,
                Err(error) => {
                    let failed = reasoning
                        .finish(StepStatus::Error)
                        .with_duration(duration_ms)
                        .with_error(error.to_string());
                    if !emit_step(sink, state, failed).await {
                        return LoopOutcome::Detached;
                    }
                    return LoopOutcome::Failed(error.to_string());
                }
            };
            if let Some(model) = &response.model {
                *model_used = model.clone();
            }

            match protocol::decode(&response.text) {
                ModelTurn::FinalAnswer { text } => {
                    let completed = reasoning
                        .finish(StepStatus::Completed)
                        .with_duration(duration_ms)
                        .with_summary("Produced a final answer");
                    if !emit_step(sink, state, completed).await {
                        return LoopOutcome::Detached;
                    }

                    let decision = StepEvent::atomic(
                        StepType::Decision,
                        "Final answer",
                        state.next_step(),
                        max_steps,
                    )
                    .with_summary(truncate_chars(&text, MAX_STRING_CHARS));
                    if !emit_step(sink, state, decision).await {
                        return LoopOutcome::Detached;
                    }
                    if !sink.send(EngineEvent::Token { content: text }).await {
                        return LoopOutcome::Detached;
                    }
                    return LoopOutcome::Answered;
                }
                ModelTurn::ToolInvocation { call, .. } => {
                    let completed = reasoning
                        .finish(StepStatus::Completed)
                        .with_duration(duration_ms)
                        .with_summary(format!("Requested tool `{}`", call.tool));
                    if !emit_step(sink, state, completed).await {
                        return LoopOutcome::Detached;
                    }

                    match self
                        .execute_tool(params, ctx, state, sink, &response.text, &call)
                        .await
                    {
                        Ok(true) => {}
                        Ok(false) => return LoopOutcome::Detached,
                        Err(()) => {
                            // Invalid tool: corrective turn already appended;
                            // the iteration is spent, no tool step emitted.
                        }
                    }
                }
            }
        }
    }

    /// Execute one validated tool call, or append a corrective turn when the
    /// name fails registry/allow-list validation (`Err(())`).
    ///
    /// `Ok(false)` means the consumer detached.
    async fn execute_tool(
        &self,
        params: &RunParams,
        ctx: &RuntimeContext,
        state: &mut RunState,
        sink: &EventSink,
        raw_response: &str,
        call: &ToolCall,
    ) -> Result<bool, ()> {
        let allowed = params.allowed_tools.iter().any(|name| name == &call.tool);
        let Some(tool) = self.registry.get(&call.tool).filter(|_| allowed).cloned() else {
            info!(tool = %call.tool, "rejected tool call; sending corrective turn");
            state.messages.push(ChatMessage::assistant(raw_response));
            state.messages.push(ChatMessage::user(corrective_message(
                &call.tool,
                &params.allowed_tools,
            )));
            return Err(());
        };

        let max_steps = self.max_steps();
        let running = StepEvent::running(
            StepType::from(tool.category()),
            tool.run_label(&call.params),
            state.next_step(),
            max_steps,
        )
        .with_tool(&call.tool)
        .with_input(&call.params);
        if !emit_step(sink, state, running.clone()).await {
            return Ok(false);
        }

        debug!(tool = %call.tool, "executing tool");
        let started = Instant::now();
        // The loop never propagates a tool exception; it degrades to a failed
        // result and the conversation continues.
        let result = match tool.execute(call.params.clone(), ctx).await {
            Ok(result) => result,
            Err(error) => ToolResult::failure(format!("Tool error: {error}")),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let finished = if result.success {
            running
                .finish(StepStatus::Completed)
                .with_duration(duration_ms)
                .with_summary(&result.summary)
                .with_output(&result.data)
        } else {
            running
                .finish(StepStatus::Error)
                .with_duration(duration_ms)
                .with_error(&result.summary)
        };
        if !emit_step(sink, state, finished).await {
            return Ok(false);
        }

        state.messages.push(ChatMessage::assistant(raw_response));
        state
            .messages
            .push(ChatMessage::user(tool_result_message(&call.tool, &result)));
        Ok(true)
    }

    /// The fallback path once the budget is exhausted: one more model call
    /// with an explicit no-more-tools instruction, executed exactly once.
    /// Returns `false` when the consumer detached.
    async fn forced_final(
        &self,
        params: &RunParams,
        state: &mut RunState,
        sink: &EventSink,
        model_used: &mut String,
    ) -> bool {
        state
            .messages
            .push(ChatMessage::user(FORCED_FINAL_INSTRUCTION));

        let answer = match self
            .provider
            .chat(&self.chat_request(params, state))
            .await
        {
            Ok(response) => {
                if let Some(model) = &response.model {
                    *model_used = model.clone();
                }
                response.text
            }
            Err(error) => {
                warn!(error = %error, "forced-final model call failed; using fallback answer");
                FALLBACK_ANSWER.to_string()
            }
        };

        let decision = StepEvent::atomic(
            StepType::Decision,
            "Final answer",
            state.next_step(),
            self.max_steps(),
        )
        .with_summary(truncate_chars(&answer, MAX_STRING_CHARS));
        if !emit_step(sink, state, decision).await {
            return false;
        }
        sink.send(EngineEvent::Token { content: answer }).await
    }

    fn chat_request(&self, params: &RunParams, state: &RunState) -> ChatRequest {
        ChatRequest {
            messages: state.messages.clone(),
            model: params.model.clone(),
            temperature: params.temperature,
        }
    }

    /// Reasoning plus action step per iteration, plus one terminal decision
    /// or forced-completion step.
    fn max_steps(&self) -> u32 {
        2 * self.max_iterations + 1
    }
}

// ── Free functions ───────────────────────────────────────────────────────────

/// Record the event in the run's audit trail and push it to the consumer.
async fn emit_step(sink: &EventSink, state: &mut RunState, event: StepEvent) -> bool {
    state.steps.push(event.clone());
    sink.send(EngineEvent::Step { data: event }).await
}

/// The synthesized user turn carrying a tool result back to the model.
fn tool_result_message(tool: &str, result: &ToolResult) -> String {
    let payload = json!({
        "tool": tool,
        "success": result.success,
        "data": result.data,
        "summary": result.summary,
    });
    format!("Tool `{tool}` returned:\n{payload}\n\nContinue helping the user with this result.")
}

// ── Tests ────────────────────────────────────────────────────────────────────
