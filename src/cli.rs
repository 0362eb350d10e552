//! Command-line interface definition for VoxChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the server and inspect the persona registry.

use clap::{Parser, Subcommand};

/// VoxChat - persona chat server with voice synthesis
///
/// Proxies chat messages to an LLM completion API under a selectable
/// persona, keeps short per-session history, and optionally speaks the
/// replies through a text-to-speech API.
#[derive(Parser, Debug, Clone)]
#[command(name = "voxchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for VoxChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        host: Option<String>,

        /// Override the port from config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the configured personas
    Personas {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Serve {
                host: None,
                port: None,
            },
        }
    }
}
