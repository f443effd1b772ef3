//! Subcommands and their shared argument groups.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Subcommand};

use preload_core::{DEFAULT_MAX_CONNECTIONS, LoadQueueConfig, ResourceType};
use preload_http::HttpClientConfig;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Load sources through the queue and report progress
    Fetch {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        queue: QueueArgs,

        /// Print the run summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show how sources resolve without loading anything
    Inspect {
        #[command(flatten)]
        sources: SourceArgs,

        /// Prefix joined onto relative sources
        #[arg(long, env = "PRELOAD_BASE_PATH")]
        base_path: Option<String>,

        /// Fetch tag-like types over the network rather than through host elements
        #[arg(long, env = "PRELOAD_PREFER_NETWORK", default_value_t = true, action = ArgAction::Set)]
        prefer_network: bool,
    },
}

/// What to load.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// URLs or file paths to load
    pub sources: Vec<String>,

    /// A JSON manifest listing descriptors to load
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Force a resource type for every positional source
    #[arg(short = 't', long = "type")]
    pub resource_type: Option<ResourceType>,
}

/// Queue and transport settings.
///
/// Every option falls back to a `PRELOAD_*` environment variable, which may
/// come from a `.env` file.
#[derive(Args, Debug, Clone)]
pub struct QueueArgs {
    /// Maximum number of loads in flight
    #[arg(short = 'c', long, env = "PRELOAD_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Fetch tag-like types over the network rather than through host elements
    #[arg(long, env = "PRELOAD_PREFER_NETWORK", default_value_t = true, action = ArgAction::Set)]
    pub prefer_network: bool,

    /// Surface scripts in the order they were queued
    #[arg(long, env = "PRELOAD_MAINTAIN_SCRIPT_ORDER", default_value_t = true, action = ArgAction::Set)]
    pub maintain_script_order: bool,

    /// Halt the queue at the first failed item
    #[arg(long, env = "PRELOAD_STOP_ON_ERROR")]
    pub stop_on_error: bool,

    /// Prefix joined onto relative sources
    #[arg(long, env = "PRELOAD_BASE_PATH")]
    pub base_path: Option<String>,

    /// Per-item load timeout in milliseconds
    #[arg(long, env = "PRELOAD_TIMEOUT_MS", default_value_t = 8000)]
    pub timeout_ms: u64,

    /// User agent sent with HTTP requests
    #[arg(long, env = "PRELOAD_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Extra request header, as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

impl QueueArgs {
    /// Queue configuration for these arguments.
    pub fn queue_config(&self) -> LoadQueueConfig {
        LoadQueueConfig::new()
            .with_max_connections(self.max_connections)
            .with_prefer_network(self.prefer_network)
            .with_maintain_script_order(self.maintain_script_order)
            .with_stop_on_error(self.stop_on_error)
            .with_base_path(self.base_path.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }

    /// HTTP client configuration for these arguments.
    pub fn http_config(&self) -> HttpClientConfig {
        let mut config = HttpClientConfig::new();
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        for (name, value) in &self.headers {
            config = config.with_header(name.clone(), value.clone());
        }
        config
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
