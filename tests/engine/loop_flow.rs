use super::support::{
    MockProvider, collect_events, run_params, step_events, text, token_contents, tool_call,
};
use kredo::engine::{Engine, EngineEvent, StepEvent, StepStatus, StepType};
use kredo::llm::ChatRole;
use kredo::tools::default_registry;
use serde_json::json;
use std::sync::Arc;

fn engine(provider: Arc<MockProvider>, max_iterations: u32) -> Engine {
    Engine::new(provider, Arc::new(default_registry()), max_iterations)
}

fn assert_steps_monotonic(steps: &[&StepEvent]) {
    let mut previous = 0;
    for step in steps {
        assert!(
            step.step >= previous,
            "step numbers must never decrease: saw {} after {previous}",
            step.step
        );
        assert!(step.step >= 1, "step numbers are 1-based");
        previous = step.step;
    }
}

fn is_tool_step(step: &StepEvent) -> bool {
    matches!(
        step.step_type,
        StepType::ToolCall | StepType::DataFetch | StepType::RuleCheck
    )
}

#[tokio::test]
async fn final_answer_only_run() {
    let provider = MockProvider::new(vec![text("The account is in good standing.")]);
    let events = collect_events(
        engine(provider.clone(), 6).run(run_params(&["calculate"], "status?")),
    )
    .await;

    let steps = step_events(&events);
    assert_steps_monotonic(&steps);
    assert!(steps.iter().all(|s| !is_tool_step(s)), "no tool step expected");

    let decisions: Vec<_> = steps
        .iter()
        .filter(|s| s.step_type == StepType::Decision)
        .collect();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].status, StepStatus::Completed);
    assert_eq!(
        decisions[0].summary.as_deref(),
        Some("The account is in good standing.")
    );

    assert_eq!(
        token_contents(&events),
        vec!["The account is in good standing."]
    );
    assert_eq!(provider.call_count(), 1);

    match events.last() {
        Some(EngineEvent::Done { provider, model }) => {
            assert_eq!(provider, "mock");
            assert_eq!(model, "mock-model");
        }
        other => panic!("expected done as the terminal event, got {other:?}"),
    }
}

#[tokio::test]
async fn single_tool_call_run() {
    let provider = MockProvider::new(vec![
        tool_call("calculate", json!({"expression": "2+2"})),
        text("The answer is 4."),
    ]);
    let events = collect_events(
        engine(provider.clone(), 6).run(run_params(&["calculate"], "what is 2+2?")),
    )
    .await;

    let steps = step_events(&events);
    assert_steps_monotonic(&steps);

    let tool_steps: Vec<_> = steps.iter().filter(|s| is_tool_step(s)).collect();
    assert_eq!(tool_steps.len(), 2, "running plus completed");
    assert_eq!(tool_steps[0].status, StepStatus::Running);
    assert_eq!(tool_steps[0].tool.as_deref(), Some("calculate"));
    assert_eq!(tool_steps[0].step_type, StepType::ToolCall);
    assert_eq!(
        tool_steps[0].input_data.as_ref().unwrap()["expression"],
        "2+2"
    );
    assert_eq!(tool_steps[1].status, StepStatus::Completed);
    assert_eq!(tool_steps[1].step, tool_steps[0].step);
    assert_eq!(
        tool_steps[1].output_data.as_ref().unwrap()["result"],
        json!(4.0)
    );
    assert!(tool_steps[1].duration_ms.is_some());

    // The tool result travels back to the model as a synthesized user turn.
    let requests = provider.seen_requests();
    assert_eq!(requests.len(), 2);
    let followup = requests[1].messages.last().unwrap();
    assert_eq!(followup.role, ChatRole::User);
    assert!(followup.content.contains("`calculate`"));
    assert!(followup.content.contains("\"success\":true"));

    assert_eq!(token_contents(&events), vec!["The answer is 4."]);
}

#[tokio::test]
async fn steps_complete_aggregates_every_step_record() {
    let provider = MockProvider::new(vec![
        tool_call("calculate", json!({"expression": "10/4"})),
        text("2.5"),
    ]);
    let events =
        collect_events(engine(provider, 6).run(run_params(&["calculate"], "divide"))).await;

    let streamed = step_events(&events);
    let aggregated = events
        .iter()
        .find_map(|event| match event {
            EngineEvent::StepsComplete { steps } => Some(steps),
            _ => None,
        })
        .expect("steps_complete frame");

    assert_eq!(aggregated.len(), streamed.len());
    // reasoning run/done, tool run/done, reasoning run/done, decision
    assert_eq!(aggregated.len(), 7);

    let position = events
        .iter()
        .position(|e| matches!(e, EngineEvent::StepsComplete { .. }))
        .unwrap();
    assert!(
        matches!(events[position + 1], EngineEvent::Done { .. }),
        "steps_complete comes after the answer and before done"
    );
}

#[tokio::test]
async fn unknown_tool_triggers_corrective_turn() {
    let provider = MockProvider::new(vec![
        tool_call("shell", json!({"command": "ls"})),
        text("I'll answer directly instead."),
    ]);
    let events = collect_events(
        engine(provider.clone(), 6).run(run_params(&["calculate"], "list files")),
    )
    .await;

    let steps = step_events(&events);
    assert!(
        steps.iter().all(|s| !is_tool_step(s)),
        "a rejected tool call must not emit a tool step"
    );

    let requests = provider.seen_requests();
    assert_eq!(requests.len(), 2);
    let corrective = requests[1].messages.last().unwrap();
    assert_eq!(corrective.role, ChatRole::User);
    assert!(corrective.content.contains("'shell' is not available"));
    assert!(corrective.content.contains("calculate"));

    assert_eq!(token_contents(&events), vec!["I'll answer directly instead."]);
}

#[tokio::test]
async fn registered_but_disallowed_tool_is_rejected() {
    let provider = MockProvider::new(vec![
        tool_call("credit_score", json!({"annual_income": 1})),
        text("done"),
    ]);
    let events = collect_events(
        engine(provider.clone(), 6).run(run_params(&["calculate"], "score me")),
    )
    .await;

    assert!(step_events(&events).iter().all(|s| !is_tool_step(s)));
    let corrective = provider.seen_requests()[1].messages.last().unwrap().clone();
    assert!(corrective.content.contains("'credit_score' is not available"));
}

#[tokio::test]
async fn system_prompt_exposes_only_allowed_tools() {
    let provider = MockProvider::new(vec![text("ok")]);
    collect_events(
        engine(provider.clone(), 6).run(run_params(&["calculate"], "hello")),
    )
    .await;

    let first = &provider.seen_requests()[0];
    let system = &first.messages[0];
    assert_eq!(system.role, ChatRole::System);
    assert!(system.content.contains("### calculate"));
    assert!(system.content.contains("Tool call protocol"));
    assert!(!system.content.contains("### credit_score"));
}

#[tokio::test]
async fn failed_tool_result_streams_as_error_step_and_run_continues() {
    // regulation_lookup with an unknown topic is a business-level failure.
    let provider = MockProvider::new(vec![
        tool_call("regulation_lookup", json!({"topic": "zoning"})),
        text("No such regulation applies."),
    ]);
    let events = collect_events(
        engine(provider.clone(), 6).run(run_params(&["regulation_lookup"], "zoning rules?")),
    )
    .await;

    let steps = step_events(&events);
    let failed = steps
        .iter()
        .find(|s| is_tool_step(s) && s.status == StepStatus::Error)
        .expect("failed tool step");
    assert!(failed.error_message.as_deref().unwrap().contains("zoning"));

    // The failure is reported to the model, and the run still answers.
    let followup = provider.seen_requests()[1].messages.last().unwrap().clone();
    assert!(followup.content.contains("\"success\":false"));
    assert_eq!(token_contents(&events), vec!["No such regulation applies."]);
}

#[tokio::test]
async fn long_string_params_are_truncated_in_events() {
    let long_query = "q".repeat(1000);
    let provider = MockProvider::new(vec![
        tool_call("document_search", json!({"query": long_query})),
        text("done"),
    ]);
    let events = collect_events(
        engine(provider, 6).run(run_params(&["document_search"], "search")),
    )
    .await;

    let steps = step_events(&events);
    let running = steps
        .iter()
        .find(|s| is_tool_step(s) && s.status == StepStatus::Running)
        .expect("tool running step");
    let query = running.input_data.as_ref().unwrap()["query"].as_str().unwrap();
    assert_eq!(query.chars().count(), 503);
    assert!(query.ends_with("..."));
}

#[tokio::test]
async fn tool_category_drives_step_type() {
    let provider = MockProvider::new(vec![
        tool_call("regulation_lookup", json!({"topic": "harassment"})),
        text("done"),
    ]);
    let events = collect_events(
        engine(provider, 6).run(run_params(&["regulation_lookup"], "rules")),
    )
    .await;

    let steps = step_events(&events);
    assert!(
        steps.iter().any(|s| s.step_type == StepType::RuleCheck),
        "regulatory tools surface as rule_check steps"
    );
}
