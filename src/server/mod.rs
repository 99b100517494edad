pub mod mcp;
pub mod transport;

pub use mcp::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer};
pub use transport::{serve_lines, serve_stdio, serve_tcp};
