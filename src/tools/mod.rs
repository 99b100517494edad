pub mod account;
pub mod adapter;
pub mod catalog;
pub mod dispatcher;
pub mod market;
pub mod orders;
pub mod schema;

pub use adapter::{ExchangeAdapter, ReadContext};
pub use catalog::{Handler, ToolCatalog, ToolDescriptor, ToolKind};
pub use dispatcher::Dispatcher;
pub use schema::{InputSchema, ParamSpec, ParamType, ValidatedArgs};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ErrorKind, ExchangeError};

/// Standard tool request format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        ToolCallRequest {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Standard tool response format: exactly one of a payload or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Ok(serde_json::Value),
    Err(ToolError),
}

impl ToolResult {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        ToolResult::Err(ToolError {
            kind,
            message: message.into(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolResult::Ok(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolResult::Ok(_) => None,
            ToolResult::Err(e) => Some(e.kind),
        }
    }
}

impl From<ExchangeError> for ToolResult {
    fn from(err: ExchangeError) -> Self {
        ToolResult::error(err.kind(), err.message())
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolResult", 2)?;
        match self {
            ToolResult::Ok(payload) => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("payload", payload)?;
            }
            ToolResult::Err(error) => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}
