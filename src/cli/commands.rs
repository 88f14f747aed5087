use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kaiwa", version, about = "Kaiwa conversational assistant server", long_about = None)]
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

    /// Enter interactive terminal chat against a session
    Chat {
        /// The UUID of the session to connect to
        #[arg(short, long)]
        session: Uuid,
    },

    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a new session for a user
    Create {
        #[arg(short, long)]
        title: String,

        /// Owner user id (must be listed in the auth config)
        #[arg(short, long)]
        user: Uuid,
    },

    /// List a user's sessions
    List {
        #[arg(short, long)]
        user: Uuid,
    },

    /// Rename a session
    Rename {
        id: Uuid,

        #[arg(short, long)]
        title: String,
    },

    /// Delete a session and its turns
    Delete {
        id: Uuid,
    },
}
