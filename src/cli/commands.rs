use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(author, version, about = "Chat with your documents through a RAG Assistant backend", long_about = None)]
pub struct Cli {
    /// API root of the backend (overrides RAG_API_URL and config files)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Keep the session identifier in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single chat message
    Chat { message: String },

    /// Start an interactive chat session
    Interactive,

    /// Upload one or more documents
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List documents known to the backend for this session
    Documents,

    /// Delete every document and index held for this session
    Clear,

    /// Check that the backend is reachable
    Health {
        /// Enable continuous monitoring (refresh every N seconds)
        #[arg(short, long)]
        watch: Option<u64>,
    },

    /// Show the session identifier sent with each request
    Session {
        /// Forget the stored identifier and start a new session
        #[arg(long)]
        reset: bool,
    },
}
