use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "kredo",
    version,
    about = "Agentic advisory engine for credit and collections workflows"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Drive one agent request locally, printing each event as it streams
    Run {
        /// Agent slug from config
        #[arg(long)]
        agent: String,
        /// The user message
        message: String,
    },
    /// List registered tools
    Tools,
}
