use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docuchat", version, about = "Document Assistant Chat Server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve,

    /// Pre-warm the retrieval and completion path with a synthetic turn
    WarmUp,

    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Mint a fresh session identifier
    New,

    /// Print the stored history for a session
    History {
        /// The session identifier to read
        id: String,

        /// Maximum number of messages to print
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}
