use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::tools::{Dispatcher, ToolCallRequest};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "hyperliquid-mcp-server";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 Request format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 Response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        JsonRpcError {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Reply to a line that is not valid JSON-RPC.
    pub fn parse_error(detail: String) -> Self {
        JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError {
                code: PARSE_ERROR,
                message: "Parse error".to_string(),
                data: Some(Value::String(detail)),
            },
        )
    }
}

/// MCP Server for Hyperliquid trading tools
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        McpServer { dispatcher }
    }

    /// Get tool definitions (MCP spec)
    pub fn get_tool_definitions(&self) -> Vec<Value> {
        self.dispatcher
            .catalog()
            .list_tools()
            .iter()
            .map(|tool| tool.definition())
            .collect()
    }

    /// Handle a JSON-RPC request. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling MCP request: {}", request.method);

        let Some(id) = request.id else {
            debug!("Notification received: {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.get_tool_definitions() })),
            "tools/call" => self.handle_tool_call(request.params).await,
            method if method.starts_with("notifications/") => return None,
            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match response {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::failure(id, err),
        })
    }

    fn handle_initialize(&self) -> Value {
        info!(
            "Client initialized session on {}",
            self.dispatcher.network()
        );
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn handle_tool_call(&self, params: Value) -> Result<Value, JsonRpcError> {
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing or invalid 'name' parameter"))?
            .to_string();

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = self
            .dispatcher
            .dispatch(ToolCallRequest::new(tool_name, arguments))
            .await;

        let structured = serde_json::to_value(&result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {}", e))
        })?;
        let text = structured.to_string();

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": structured,
            "isError": !result.is_ok(),
        }))
    }
}
