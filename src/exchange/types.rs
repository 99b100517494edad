use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good til cancelled
    #[default]
    Gtc,
    /// Immediate or cancel
    Ioc,
    /// Add liquidity only (post-only)
    Alo,
}

impl TimeInForce {
    /// Spelling expected inside the signed order action.
    pub fn wire_name(self) -> &'static str {
        match self {
            TimeInForce::Gtc => "Gtc",
            TimeInForce::Ioc => "Ioc",
            TimeInForce::Alo => "Alo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Limit { price: Decimal, tif: TimeInForce },
    /// Aggressive IOC order priced off the current mid by the client.
    Market,
}

/// Perpetual asset metadata from the exchange universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMeta {
    pub index: u32,
    pub name: String,
    pub sz_decimals: u32,
    pub max_leverage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub asset: AssetMeta,
    pub side: Side,
    pub size: Decimal,
    pub kind: OrderKind,
    pub reduce_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderStatus {
    Resting,
    Filled {
        filled_size: Decimal,
        average_price: Decimal,
    },
    WaitingForFill,
    WaitingForTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: Option<u64>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    pub asset: u32,
    pub symbol: String,
    pub order_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub symbol: String,
    /// Signed: negative for shorts.
    pub size: Decimal,
    pub entry_price: Option<Decimal>,
    pub position_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub liquidation_price: Option<Decimal>,
    pub leverage: Option<u32>,
    pub margin_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountState {
    pub address: String,
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
    pub total_notional_position: Decimal,
    pub withdrawable: Decimal,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOrder {
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub order_id: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub orders: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBook {
    pub symbol: String,
    pub time: u64,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}
