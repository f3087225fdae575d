mod cli;
mod config;
mod core;
mod server;
mod utils;

use cli::Cli;
use utils::logging;

/// TimeCamp MCP Server
///
/// Usage: npx @modelcontextprotocol/inspector cargo run --bin mcp-server-timecamp
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let config = Cli::parse_config()?;

    // Initialize logging based on environment
    logging::init_logging()?;

    tracing::info!(
        "Starting TimeCamp MCP server ({:?} transport, API at {})",
        config.transport,
        config.base_url
    );
    if config.api_token.is_none() {
        tracing::warn!("No default API token configured; calls must carry an Authorization header");
    }

    // Run the MCP server
    if let Err(e) = server::run(config).await {
        tracing::error!("Failed to run MCP server: {}", e);
        return Err(e);
    }

    Ok(())
}
