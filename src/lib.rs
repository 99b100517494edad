pub mod config;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod logging;
pub mod network;
pub mod precision;
pub mod retry;
pub mod server;
pub mod tools;

pub use config::{Config, LogConfig, Transport};
pub use error::{ErrorKind, ExchangeError, Result};
pub use network::{Network, NetworkContext};
pub use server::McpServer;
pub use tools::{Dispatcher, ToolCallRequest, ToolResult};
