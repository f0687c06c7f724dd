use anyhow::Result;
use clap::Parser;
use kredo::cli::{Cli, Commands};
use kredo::config::Config;
use kredo::engine::{Engine, EngineEvent, RunParams};
use kredo::gateway;
use kredo::llm::build_provider;
use kredo::tools::default_registry;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS before any reqwest
    // client is built.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load_or_init()?;
    dispatch(cli, config).await
}

async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        None => serve(config).await,
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            serve(config).await
        }
        Some(Commands::Run { agent, message }) => run_local(&config, &agent, &message).await,
        Some(Commands::Tools) => {
            let registry = default_registry();
            for spec in registry.specs() {
                println!("{:<20} {}", spec.name, spec.description);
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let provider = build_provider(&config.provider);
    let registry = Arc::new(default_registry());
    gateway::serve(Arc::new(config), provider, registry).await
}

/// Drive one run from the terminal: step frames as JSON lines, the final
/// answer as plain text.
async fn run_local(config: &Config, agent_slug: &str, message: &str) -> Result<()> {
    let Some(agent) = config.find_agent(agent_slug) else {
        anyhow::bail!(
            "unknown agent '{agent_slug}'; configured agents: {}",
            config
                .agents
                .iter()
                .map(|a| a.slug.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    let provider = build_provider(&config.provider);

    // An agent with no tools never enters the engine.
    if agent.tools.is_empty() {
        let response = provider
            .chat(&kredo::llm::ChatRequest {
                messages: vec![
                    kredo::llm::ChatMessage::system(&agent.system_prompt),
                    kredo::llm::ChatMessage::user(message),
                ],
                model: agent
                    .model
                    .clone()
                    .unwrap_or_else(|| config.provider.model.clone()),
                temperature: agent.temperature.unwrap_or(config.provider.temperature),
            })
            .await?;
        println!("{}", response.text);
        return Ok(());
    }

    let registry = Arc::new(default_registry());
    let engine = Engine::new(provider, registry, config.engine.max_iterations);

    let mut rx = engine.run(RunParams {
        agent_id: agent.id(),
        agent_slug: agent.slug.clone(),
        system_prompt: agent.system_prompt.clone(),
        user_message: message.to_string(),
        history: Vec::new(),
        allowed_tools: agent.tools.clone(),
        document_text: None,
        model: agent
            .model
            .clone()
            .unwrap_or_else(|| config.provider.model.clone()),
        temperature: agent.temperature.unwrap_or(config.provider.temperature),
    });

    while let Some(event) = rx.recv().await {
        match &event {
            EngineEvent::Token { content } => println!("\n{content}"),
            EngineEvent::Error { message } => eprintln!("error: {message}"),
            other => println!("{}", serde_json::to_string(other)?),
        }
    }
    Ok(())
}
