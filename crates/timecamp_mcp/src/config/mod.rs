use std::net::SocketAddr;
use std::time::Duration;

use clap::ValueEnum;

/// How the MCP server talks to its client
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    /// JSON-RPC over stdin/stdout
    Stdio,
    /// Streamable HTTP at `/mcp`; callers may send their own Authorization header
    Http,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: Option<String>,
    pub base_url: String,
    pub transport: TransportMode,
    pub bind: SocketAddr,
    pub timeout: Duration,
}
