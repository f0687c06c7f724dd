use super::support::{MockProvider, text, tool_call};
use kredo::config::{AgentConfig, Config};
use kredo::engine::Engine;
use kredo::gateway::{AppState, build_router};
use kredo::tools::default_registry;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

async fn spawn_gateway(provider: Arc<MockProvider>) -> SocketAddr {
    let mut config = Config::with_default_agents();
    config.agents.push(AgentConfig {
        slug: "plain".into(),
        name: "Plain Responder".into(),
        system_prompt: "Answer directly.".into(),
        tools: Vec::new(),
        model: None,
        temperature: None,
    });

    let registry = Arc::new(default_registry());
    let state = AppState {
        engine: Engine::new(provider.clone(), registry.clone(), 6),
        provider,
        registry,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

fn parse_frames(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|payload| serde_json::from_str(payload).expect("valid JSON frame"))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn run_route_streams_step_token_and_done_frames() {
    let provider = MockProvider::new(vec![
        tool_call("collections_score", json!({"days_past_due": 30, "outstanding_balance": 500})),
        text("Recommend a soft reminder."),
    ]);
    let addr = spawn_gateway(provider).await;

    let body = reqwest::Client::new()
        .post(format!("http://{addr}/api/agent/run"))
        .json(&json!({"agent": "collections-advisor", "message": "advise on this account"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let frames = parse_frames(&body);
    assert!(frames.len() >= 4);
    assert_eq!(frames[0]["type"], "step");
    assert!(frames.iter().any(|f| f["type"] == "token"));
    assert!(frames.iter().any(|f| f["type"] == "steps_complete"));
    assert_eq!(frames.last().unwrap()["type"], "done");

    let token = frames.iter().find(|f| f["type"] == "token").unwrap();
    assert_eq!(token["content"], "Recommend a soft reminder.");
}

#[tokio::test(flavor = "multi_thread")]
async fn run_route_rejects_unknown_agent() {
    let provider = MockProvider::new(vec![]);
    let addr = spawn_gateway(provider).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/agent/run"))
        .json(&json!({"agent": "nope", "message": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("unknown agent"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_route_rejects_empty_message() {
    let provider = MockProvider::new(vec![]);
    let addr = spawn_gateway(provider).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/agent/run"))
        .json(&json!({"agent": "collections-advisor", "message": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn toolless_agent_takes_the_single_shot_path() {
    let provider = MockProvider::new(vec![text("Direct answer.")]);
    let addr = spawn_gateway(provider.clone()).await;

    let body = reqwest::Client::new()
        .post(format!("http://{addr}/api/agent/run"))
        .json(&json!({"agent": "plain", "message": "hello"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let frames = parse_frames(&body);
    let types: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["token", "done"], "no step frames outside the engine");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn agents_route_lists_configured_agents() {
    let provider = MockProvider::new(vec![]);
    let addr = spawn_gateway(provider).await;

    let agents: Vec<Value> = reqwest::Client::new()
        .get(format!("http://{addr}/api/agents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let slugs: Vec<&str> = agents
        .iter()
        .map(|a| a["slug"].as_str().unwrap())
        .collect();
    assert!(slugs.contains(&"credit-advisor"));
    assert!(slugs.contains(&"collections-advisor"));
    assert!(slugs.contains(&"plain"));

    let credit = agents
        .iter()
        .find(|a| a["slug"] == "credit-advisor")
        .unwrap();
    assert!(
        credit["tools"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t == "credit_score")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn health_route_responds() {
    let provider = MockProvider::new(vec![]);
    let addr = spawn_gateway(provider).await;

    let body = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");
}
