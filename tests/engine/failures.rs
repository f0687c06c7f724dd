use super::support::{
    MockProvider, collect_events, failure, run_params, step_events, text, token_contents, tool_call,
};
use async_trait::async_trait;
use kredo::engine::{Engine, EngineEvent, StepStatus, StepType};
use kredo::tools::{ParamSpec, RuntimeContext, Tool, ToolCategory, ToolRegistry, ToolResult};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A tool whose capability throws instead of returning a failed result.
struct ThrowingTool;

#[async_trait]
impl Tool for ThrowingTool {
    fn name(&self) -> &str {
        "throwing"
    }

    fn description(&self) -> &str {
        "always throws"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Calculation
    }

    fn parameters(&self) -> BTreeMap<String, ParamSpec> {
        BTreeMap::new()
    }

    async fn execute(&self, _params: Value, _ctx: &RuntimeContext) -> anyhow::Result<ToolResult> {
        anyhow::bail!("backing service exploded")
    }
}

fn engine_with_throwing_tool(provider: Arc<MockProvider>) -> Engine {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ThrowingTool));
    Engine::new(provider, Arc::new(registry), 6)
}

#[tokio::test]
async fn provider_error_is_fatal_to_the_run() {
    let provider = MockProvider::new(vec![failure("connection reset by peer")]);
    let registry = Arc::new(kredo::tools::default_registry());
    let engine = Engine::new(provider.clone(), registry, 6);
    let events = collect_events(engine.run(run_params(&["calculate"], "hello"))).await;

    // The in-flight reasoning step closes with an error status.
    let steps = step_events(&events);
    assert!(
        steps
            .iter()
            .any(|s| s.step_type == StepType::LlmReasoning && s.status == StepStatus::Error)
    );

    // Then: error frame, done frame, nothing else.
    let error_position = events
        .iter()
        .position(|e| matches!(e, EngineEvent::Error { .. }))
        .expect("error frame");
    match &events[error_position] {
        EngineEvent::Error { message } => assert!(message.contains("connection reset")),
        _ => unreachable!(),
    }
    assert!(matches!(events[error_position + 1], EngineEvent::Done { .. }));
    assert_eq!(events.len(), error_position + 2);

    assert!(token_contents(&events).is_empty(), "no answer on fatal error");
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EngineEvent::StepsComplete { .. })),
        "no audit aggregate on the fatal path"
    );
    assert_eq!(provider.call_count(), 1, "provider errors are not retried");
}

#[tokio::test]
async fn throwing_tool_degrades_to_error_step_and_run_continues() {
    let provider = MockProvider::new(vec![
        tool_call("throwing", json!({})),
        text("Recovered and answered anyway."),
    ]);
    let events = collect_events(
        engine_with_throwing_tool(provider.clone()).run(run_params(&["throwing"], "go")),
    )
    .await;

    let steps = step_events(&events);
    let failed = steps
        .iter()
        .find(|s| s.tool.as_deref() == Some("throwing") && s.status == StepStatus::Error)
        .expect("error step for the throwing tool");
    let message = failed.error_message.as_deref().unwrap();
    assert!(message.starts_with("Tool error:"));
    assert!(message.contains("backing service exploded"));

    // The loop swallowed the exception and went on to a final answer.
    assert_eq!(provider.call_count(), 2);
    assert_eq!(token_contents(&events), vec!["Recovered and answered anyway."]);
    assert!(matches!(events.last(), Some(EngineEvent::Done { .. })));
}

#[tokio::test]
async fn detached_consumer_stops_the_run_before_further_calls() {
    let provider = MockProvider::new(vec![
        tool_call("calculate", json!({"expression": "1+1"})),
        tool_call("calculate", json!({"expression": "2+2"})),
        text("never reached"),
    ]);
    let registry = Arc::new(kredo::tools::default_registry());
    let engine = Engine::new(provider.clone(), registry, 6);

    let rx = engine.run(run_params(&["calculate"], "compute"));
    drop(rx);

    // Give the spawned run a moment to observe the closed channel.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        provider.call_count(),
        0,
        "the run must stop at its first emission, before any model call"
    );
}
