use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::config::{Config, TransportMode};
use crate::core::api::DEFAULT_BASE_URL;
use crate::core::error::{TimeCampError, TimeCampResult};

/// TimeCamp MCP Server
///
/// A Model Context Protocol server that lets an agent log, list, update and
/// delete TimeCamp time entries and browse tasks.
///
/// ## Development
/// ```bash
/// npx @modelcontextprotocol/inspector cargo run --bin mcp-server-timecamp
/// ```
///
/// ## Configuration
/// Add to your MCP client configuration:
/// ```json
/// {
///   "mcpServers": {
///     "timecamp": {
///       "command": "mcp-server-timecamp",
///       "env": {
///         "TIMECAMP_API_TOKEN": "<your token>",
///         "RUST_LOG": "info"
///       }
///     }
///   }
/// }
/// ```
///
/// ## Environment Variables
/// - `TIMECAMP_API_TOKEN`: Default API token, used when a call carries no Authorization header
/// - `TIMECAMP_BASE_URL`: TimeCamp API base URL
/// - `RUST_LOG`: Controls logging verbosity (trace, debug, info, warn, error)
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-server-timecamp")]
#[command(about = "An MCP server for TimeCamp time entries and tasks")]
#[command(version)]
#[command(
    long_about = "A Model Context Protocol (MCP) server that exposes the TimeCamp API as tools. \nSupports creating, listing, updating and deleting time entries and listing tasks."
)]
pub struct Cli {
    /// Default TimeCamp API token
    ///
    /// Used for every call over stdio, and for HTTP calls without an Authorization header.
    #[arg(long, env = "TIMECAMP_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// TimeCamp API base URL
    #[arg(long, env = "TIMECAMP_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Transport used to serve MCP
    #[arg(long, env = "TIMECAMP_MCP_TRANSPORT", value_enum, default_value_t = TransportMode::Stdio)]
    pub transport: TransportMode,

    /// Address to listen on with the HTTP transport
    #[arg(long, env = "TIMECAMP_MCP_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Timeout for TimeCamp API requests, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Cli {
    /// Parse CLI arguments and convert to configuration
    pub fn parse_config() -> TimeCampResult<Config> {
        Self::parse().into_config()
    }

    pub fn into_config(self) -> TimeCampResult<Config> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(TimeCampError::Config {
                message: format!("base URL must be http(s): {}", self.base_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(TimeCampError::Config {
                message: "timeout must be at least one second".to_string(),
            });
        }

        Ok(Config {
            api_token: self
                .api_token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            base_url,
            transport: self.transport,
            bind: self.bind,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["mcp-server-timecamp"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_explicit_arguments() {
        let config = parse(&[
            "--api-token",
            " abc ",
            "--base-url",
            "http://localhost:8080/api/",
            "--transport",
            "http",
            "--bind",
            "0.0.0.0:9000",
            "--timeout-secs",
            "5",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad_url = parse(&["--base-url", "ftp://example.test"]).into_config();
        assert!(bad_url.is_err());

        let zero_timeout = parse(&["--base-url", DEFAULT_BASE_URL, "--timeout-secs", "0"]).into_config();
        assert!(zero_timeout.is_err());

        assert!(Cli::try_parse_from(["mcp-server-timecamp", "--transport", "carrier-pigeon"]).is_err());
    }
}
