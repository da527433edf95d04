//! Ledger ATM MCP Server
//!
//! Serves the ledger orchestrator as MCP tools over stdio.

use std::sync::Arc;

use rmcp::ServiceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ledger_atm_mcp::{Config, LedgerAtmServer, LedgerOrchestrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging; stdout belongs to the MCP transport
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!(contract = %config.contract_address, "Starting Ledger ATM MCP Server");

    let orchestrator = Arc::new(LedgerOrchestrator::from_config(&config)?);
    let state = orchestrator.initialize().await;
    tracing::info!(state = %state, "Wallet detection finished");

    let server = LedgerAtmServer::new(orchestrator, config.ledger_decimals);

    // Run with stdio transport
    let transport = rmcp::transport::stdio();
    let running = server.serve(transport).await?;

    // Wait for the server to finish
    running.waiting().await?;

    Ok(())
}
