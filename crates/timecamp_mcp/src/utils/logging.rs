use tracing_subscriber::{EnvFilter, prelude::*};

use crate::core::error::{TimeCampError, TimeCampResult};

/// Install the tracing subscriber when `RUST_LOG` is set; otherwise stay silent.
///
/// Over stdio the MCP client owns stdout, so every log line is written to
/// stderr without ANSI colours. Malformed directives are an error rather than
/// being dropped. A second install (e.g. from a test) reports
/// `TimeCampError::LoggingInitialization`.
pub fn init_logging() -> TimeCampResult<()> {
    let Ok(directives) = std::env::var("RUST_LOG") else {
        return Ok(());
    };
    let filter = EnvFilter::try_new(&directives).map_err(|e| {
        TimeCampError::LoggingInitialization(format!("invalid RUST_LOG '{}': {}", directives, e))
    })?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| TimeCampError::LoggingInitialization(e.to_string()))
}
