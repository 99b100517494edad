use hyperliquid_mcp_server::server::{serve_stdio, serve_tcp};
use hyperliquid_mcp_server::{logging, Config, Dispatcher, LogConfig, McpServer, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    logging::init_logging(&LogConfig::from_env());

    info!("Starting Hyperliquid MCP Server...");

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Network: {}", config.network);
    match &config.credential {
        Some(credential) => info!("Trading account: {}", credential.address()),
        None => warn!("No signing key loaded: trading tools will return Unauthorized"),
    }
    if let Some(account) = config.account_address {
        info!("Default account for reads: {}", account);
    }

    let dispatcher = Arc::new(Dispatcher::from_config(&config)?);
    let names: Vec<_> = dispatcher
        .catalog()
        .list_tools()
        .iter()
        .map(|tool| tool.name)
        .collect();
    info!("Available tools: {}", names.join(", "));

    let mcp_server = Arc::new(McpServer::new(dispatcher));

    match config.transport {
        Transport::Stdio => serve_stdio(mcp_server).await,
        Transport::Tcp(addr) => serve_tcp(addr, mcp_server).await,
    }
}
