use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::schema::{InputSchema, ParamSpec, ParamType};

const SIDES: &[&str] = &["buy", "sell"];
const ORDER_TYPES: &[&str] = &["limit", "market"];
const TIME_IN_FORCE: &[&str] = &["gtc", "ioc", "alo"];

pub const MAX_BOOK_DEPTH: u64 = 20;
pub const DEFAULT_BOOK_DEPTH: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Read,
    Write,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Read => write!(f, "read"),
            ToolKind::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOperation {
    GetPrice,
    GetOrderBook,
    GetAccountState,
    GetOpenOrders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    PlaceOrder,
    CancelOrder,
    CancelAllOrders,
}

/// What a tool runs. Read handlers never see a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Read(ReadOperation),
    Write(WriteOperation),
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: InputSchema,
    pub handler: Handler,
}

impl ToolDescriptor {
    pub fn read(
        name: &'static str,
        description: &'static str,
        params: Vec<ParamSpec>,
        op: ReadOperation,
    ) -> Self {
        ToolDescriptor {
            name,
            description,
            input_schema: InputSchema::new(params),
            handler: Handler::Read(op),
        }
    }

    pub fn write(
        name: &'static str,
        description: &'static str,
        params: Vec<ParamSpec>,
        op: WriteOperation,
    ) -> Self {
        ToolDescriptor {
            name,
            description,
            input_schema: InputSchema::new(params),
            handler: Handler::Write(op),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self.handler {
            Handler::Read(_) => ToolKind::Read,
            Handler::Write(_) => ToolKind::Write,
        }
    }

    /// Entry of the MCP `tools/list` result.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema.to_json_schema(),
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),

    #[error("tool name must not be empty")]
    EmptyName,
}

/// Immutable registry of the tools this server exposes.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

#[derive(Debug, Default)]
pub struct ToolCatalogBuilder {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalogBuilder {
    pub fn register(mut self, descriptor: ToolDescriptor) -> Self {
        self.tools.push(descriptor);
        self
    }

    pub fn build(self) -> Result<ToolCatalog, CatalogError> {
        let mut index = HashMap::with_capacity(self.tools.len());
        for (i, tool) in self.tools.iter().enumerate() {
            if tool.name.is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if index.insert(tool.name, i).is_some() {
                return Err(CatalogError::DuplicateName(tool.name.to_string()));
            }
        }
        Ok(ToolCatalog {
            tools: self.tools,
            index,
        })
    }
}

impl ToolCatalog {
    pub fn builder() -> ToolCatalogBuilder {
        ToolCatalogBuilder::default()
    }

    /// The fixed Hyperliquid tool set.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::builder()
            .register(ToolDescriptor::read(
                "get_price",
                "Get the current mid price of a perpetual market (e.g. BTC). Returns the price as an exact decimal string.",
                vec![ParamSpec::required(
                    "symbol",
                    ParamType::Symbol,
                    "Market symbol, e.g. BTC or ETH",
                )],
                ReadOperation::GetPrice,
            ))
            .register(ToolDescriptor::read(
                "get_order_book",
                "Get the L2 order book snapshot of a perpetual market",
                vec![
                    ParamSpec::required("symbol", ParamType::Symbol, "Market symbol, e.g. BTC"),
                    ParamSpec::optional(
                        "depth",
                        ParamType::Integer {
                            min: 1,
                            max: MAX_BOOK_DEPTH,
                        },
                        "Levels per side (default 5, max 20)",
                    ),
                ],
                ReadOperation::GetOrderBook,
            ))
            .register(ToolDescriptor::read(
                "get_account_state",
                "Get margin summary and open positions of an account",
                vec![ParamSpec::optional(
                    "address",
                    ParamType::Address,
                    "Account address (defaults to the configured account)",
                )],
                ReadOperation::GetAccountState,
            ))
            .register(ToolDescriptor::read(
                "get_open_orders",
                "List resting orders of an account, optionally for one market",
                vec![
                    ParamSpec::optional(
                        "address",
                        ParamType::Address,
                        "Account address (defaults to the configured account)",
                    ),
                    ParamSpec::optional("symbol", ParamType::Symbol, "Only orders on this market"),
                ],
                ReadOperation::GetOpenOrders,
            ))
            .register(ToolDescriptor::write(
                "place_order",
                "Place a limit or market order on a perpetual market. Market orders are sent as IOC orders with a protective price around the mid.",
                vec![
                    ParamSpec::required("symbol", ParamType::Symbol, "Market symbol, e.g. BTC"),
                    ParamSpec::required("side", ParamType::Enum(SIDES), "buy or sell"),
                    ParamSpec::required(
                        "size",
                        ParamType::PositiveDecimal,
                        "Order size in base units",
                    ),
                    ParamSpec::optional(
                        "price",
                        ParamType::PositiveDecimal,
                        "Limit price; required for limit orders, not allowed for market orders",
                    ),
                    ParamSpec::optional(
                        "order_type",
                        ParamType::Enum(ORDER_TYPES),
                        "limit or market (default: limit when price is given, else market)",
                    ),
                    ParamSpec::optional(
                        "time_in_force",
                        ParamType::Enum(TIME_IN_FORCE),
                        "Limit orders only: gtc (default), ioc or alo (post-only)",
                    ),
                    ParamSpec::optional(
                        "reduce_only",
                        ParamType::Boolean,
                        "Only reduce an existing position",
                    ),
                ],
                WriteOperation::PlaceOrder,
            ))
            .register(ToolDescriptor::write(
                "cancel_order",
                "Cancel one resting order by id",
                vec![
                    ParamSpec::required("symbol", ParamType::Symbol, "Market of the order"),
                    ParamSpec::required("order_id", ParamType::ANY_INTEGER, "Exchange order id"),
                ],
                WriteOperation::CancelOrder,
            ))
            .register(ToolDescriptor::write(
                "cancel_all_orders",
                "Cancel every resting order of the trading account, optionally only on one market",
                vec![ParamSpec::optional(
                    "symbol",
                    ParamType::Symbol,
                    "Only cancel orders on this market",
                )],
                WriteOperation::CancelAllOrders,
            ))
            .build()
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
