//! Monarch Money MCP server entry point.
//!
//! Builds a [`MonarchMcpServer`] from the environment and serves MCP
//! tools over stdio. No login happens here: the first tool call that
//! needs the remote API searches for a saved session and, failing that,
//! falls back to `MONARCH_EMAIL`/`MONARCH_PASSWORD` credentials.

use monarch_mcp::config::ServerConfig;
use monarch_mcp::server::MonarchMcpServer;
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

/// Runs the MCP server.
///
/// # Errors
///
/// Returns an error if the stdio transport cannot be established or
/// fails while serving.
async fn run() -> Result<(), Box<dyn core::error::Error>> {
    // Initialise tracing to stderr (stdout is used for MCP stdio transport).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("starting Monarch Money MCP server");

    let config = ServerConfig::from_env();
    let server = MonarchMcpServer::new(config);

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let service = server.serve(transport).await?;

    tracing::info!("MCP server running on stdio");
    let _quit_reason = service.waiting().await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(%err, "fatal error");
        std::process::exit(1);
    }
}
