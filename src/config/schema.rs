use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

// ── Provider ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind: "openrouter", "openai", or any OpenAI-compatible host.
    #[serde(default = "default_provider_kind")]
    pub kind: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Explicit API key; falls back to environment variables when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Per-call timeout - the only timeout mechanism in the system.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_provider_kind() -> String {
    "openrouter".into()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}

fn default_temperature() -> f64 {
    0.2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8420
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model-call budget per run (not counting the forced-final call).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    6
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

// ── Agents ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// URL-safe identifier the gateway routes on.
    pub slug: String,
    pub name: String,
    pub system_prompt: String,
    /// Allow-list: the subset of registry tools this agent may invoke.
    /// Empty means the agent answers single-shot, without the engine.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl AgentConfig {
    pub fn id(&self) -> String {
        format!("agent:{}", self.slug)
    }
}

// ── Loading / validation ─────────────────────────────────────────

impl Config {
    /// Load config from the platform config directory, writing a default
    /// file on first run.
    pub fn load_or_init() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "kredo")
            .context("could not determine config directory")?;
        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            Self::load_from(&path)
        } else {
            let mut config = Self::with_default_agents();
            fs::create_dir_all(dirs.config_dir())?;
            let rendered =
                toml::to_string_pretty(&config).context("serializing default config")?;
            fs::write(&path, rendered)?;
            config.config_path = path;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut config: Config =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// The default config shipped on first run: one advisory agent per
    /// workflow, with the tools each workflow needs.
    pub fn with_default_agents() -> Self {
        Self {
            agents: vec![
                AgentConfig {
                    slug: "credit-advisor".into(),
                    name: "Credit Advisor".into(),
                    system_prompt: "You are a credit advisory assistant for loan officers. \
                                    Use the available tools to score profiles and check \
                                    regulations before answering. Summaries are informational, \
                                    not legal advice."
                        .into(),
                    tools: vec![
                        "credit_score".into(),
                        "regulation_lookup".into(),
                        "calculate".into(),
                        "document_search".into(),
                    ],
                    model: None,
                    temperature: None,
                },
                AgentConfig {
                    slug: "collections-advisor".into(),
                    name: "Collections Advisor".into(),
                    system_prompt: "You are a collections advisory assistant. Score accounts, \
                                    verify contact rules against regulations, and recommend \
                                    compliant next actions."
                        .into(),
                    tools: vec![
                        "collections_score".into(),
                        "regulation_lookup".into(),
                        "calculate".into(),
                    ],
                    model: None,
                    temperature: None,
                },
            ],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!(
                "provider.temperature must be within 0.0..=2.0, got {}",
                self.provider.temperature
            );
        }
        if self.engine.max_iterations == 0 {
            anyhow::bail!("engine.max_iterations must be at least 1");
        }
        let mut slugs: Vec<&str> = self.agents.iter().map(|a| a.slug.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        if slugs.len() != self.agents.len() {
            anyhow::bail!("agent slugs must be unique");
        }
        for agent in &self.agents {
            if agent.slug.trim().is_empty() {
                anyhow::bail!("agent slug cannot be empty");
            }
            if let Some(temperature) = agent.temperature
                && !(0.0..=2.0).contains(&temperature)
            {
                anyhow::bail!(
                    "agent '{}' temperature must be within 0.0..=2.0",
                    agent.slug
                );
            }
        }
        Ok(())
    }

    pub fn find_agent(&self, slug: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|agent| agent.slug == slug)
    }
}
