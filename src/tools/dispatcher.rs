use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, info_span, warn, Instrument};

use super::adapter::{ExchangeAdapter, ReadContext};
use super::catalog::{Handler, ToolCatalog, ToolDescriptor};
use super::{ToolCallRequest, ToolResult};
use crate::config::Config;
use crate::credential::{CredentialResolver, StaticResolver};
use crate::error::{ConfigError, ErrorKind};
use crate::exchange::{ExchangeClient, HyperliquidClient};
use crate::network::NetworkContext;

/// Routes tool calls: lookup, validate, authorize, invoke, wrap.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct Dispatcher {
    catalog: ToolCatalog,
    adapter: ExchangeAdapter,
    resolver: Arc<dyn CredentialResolver>,
    read_context: ReadContext,
}

impl Dispatcher {
    pub fn new(
        catalog: ToolCatalog,
        adapter: ExchangeAdapter,
        resolver: Arc<dyn CredentialResolver>,
        read_context: ReadContext,
    ) -> Self {
        Dispatcher {
            catalog,
            adapter,
            resolver,
            read_context,
        }
    }

    /// Wire the standard catalog to the Hyperliquid client.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let catalog = ToolCatalog::standard().map_err(|e| ConfigError::Catalog(e.to_string()))?;
        let client = HyperliquidClient::new(config.market_slippage)
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self::with_client(config, catalog, Arc::new(client)))
    }

    pub fn with_client(
        config: &Config,
        catalog: ToolCatalog,
        client: Arc<dyn ExchangeClient>,
    ) -> Self {
        let adapter = ExchangeAdapter::new(client, config.timeout, config.read_attempts);
        let resolver = StaticResolver::new(config.credential.clone(), config.network.clone());
        let read_context = ReadContext {
            network: config.network.clone(),
            account: config.account_address,
        };
        Self::new(catalog, adapter, Arc::new(resolver), read_context)
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn network(&self) -> &NetworkContext {
        &self.read_context.network
    }

    pub async fn dispatch(&self, request: ToolCallRequest) -> ToolResult {
        let Some(descriptor) = self.catalog.get(&request.tool_name) else {
            warn!("Unknown tool requested: {}", request.tool_name);
            return ToolResult::error(
                ErrorKind::UnknownTool,
                format!("unknown tool '{}'", request.tool_name),
            );
        };

        let span = info_span!("tool_call", tool = descriptor.name, kind = %descriptor.kind());
        self.run(descriptor, &request.arguments)
            .instrument(span)
            .await
    }

    async fn run(&self, descriptor: &ToolDescriptor, arguments: &Value) -> ToolResult {
        let args = match descriptor.input_schema.validate(arguments) {
            Ok(args) => args,
            Err(message) => {
                warn!("Invalid arguments: {}", message);
                return ToolResult::error(ErrorKind::InvalidArguments, message);
            }
        };

        let started = Instant::now();
        let outcome = match descriptor.handler {
            Handler::Read(op) => {
                self.adapter
                    .invoke_read(op, &args, &self.read_context)
                    .await
            }
            Handler::Write(op) => {
                let signing = match self.resolver.resolve() {
                    Ok(signing) => signing,
                    Err(e) => {
                        warn!("Write refused: {}", e);
                        return ToolResult::error(ErrorKind::Unauthorized, e.to_string());
                    }
                };
                if signing.network != self.read_context.network {
                    error!(
                        "Credential resolved for {} but dispatcher serves {}",
                        signing.network, self.read_context.network
                    );
                    return ToolResult::error(
                        ErrorKind::Internal,
                        "signing context does not match the configured network",
                    );
                }
                self.adapter.invoke_write(op, &args, &signing).await
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(payload) => {
                info!(elapsed_ms, "Tool call succeeded");
                ToolResult::Ok(payload)
            }
            Err(e) => {
                warn!(elapsed_ms, kind = ?e.kind(), "Tool call failed: {}", e);
                ToolResult::from(e)
            }
        }
    }
}
