//! Exchange Balances MCP Server
//!
//! A Model Context Protocol server tracking exchange account balances.

use rmcp::ServiceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exchange_balances_mcp::{Config, ExchangeBalancesServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!("Starting Exchange Balances MCP Server");

    // Create the server
    let server = ExchangeBalancesServer::new(config)?;

    // The backend may not be up yet; accounts can be set up through the tools
    match server.load_accounts().await {
        Ok(count) if count > 0 => {
            let registry = server.registry().clone();
            tokio::spawn(async move { registry.fetch_all_configured_balances(false).await });
        }
        Ok(_) => tracing::info!("No exchanges configured"),
        Err(e) => tracing::warn!(error = %e, "Could not load configured exchanges"),
    }

    // Run with stdio transport
    let transport = rmcp::transport::stdio();
    let running = server.serve(transport).await?;

    // Wait for the server to finish
    running.waiting().await?;

    Ok(())
}
