//! Hyperliquid HTTP wire formats.
//!
//! Field order of the action structs is part of the signature: the action is
//! msgpack-encoded as a map in declaration order before hashing.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{
    AccountState, AssetMeta, BookLevel, OpenOrder, OrderBook, Position, Side,
};
use super::ClientError;

// ---------------------------------------------------------------------------
// Signed actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Order(BulkOrder),
    Cancel(BulkCancel),
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOrder {
    pub orders: Vec<OrderWire>,
    pub grouping: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWire {
    /// asset index
    pub a: u32,
    /// is buy
    pub b: bool,
    /// limit price
    pub p: String,
    /// size
    pub s: String,
    /// reduce only
    pub r: bool,
    pub t: OrderTypeWire,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderTypeWire {
    Limit(LimitWire),
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitWire {
    pub tif: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkCancel {
    pub cancels: Vec<CancelWire>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelWire {
    pub a: u32,
    pub o: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureWire {
    pub r: String,
    pub s: String,
    pub v: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload<'a> {
    pub action: &'a Action,
    pub nonce: u64,
    pub signature: SignatureWire,
    pub vault_address: Option<String>,
}

// ---------------------------------------------------------------------------
// /exchange responses
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "status", content = "response", rename_all = "lowercase")]
pub enum ExchangeResponseStatus {
    Ok(ExchangeResponse),
    Err(String),
}

#[derive(Debug, Deserialize)]
pub struct ExchangeResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<ExchangeData>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeData {
    pub statuses: Vec<ExchangeDataStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExchangeDataStatus {
    Success,
    WaitingForFill,
    WaitingForTrigger,
    Error(String),
    Resting(RestingOrder),
    Filled(FilledOrder),
}

#[derive(Debug, Deserialize)]
pub struct RestingOrder {
    pub oid: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledOrder {
    pub total_sz: Decimal,
    pub avg_px: Decimal,
    pub oid: u64,
}

// ---------------------------------------------------------------------------
// /info responses
// ---------------------------------------------------------------------------

pub type AllMids = HashMap<String, Decimal>;

#[derive(Debug, Deserialize)]
pub struct MetaResponse {
    pub universe: Vec<AssetInfoWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfoWire {
    pub name: String,
    pub sz_decimals: u32,
    #[serde(default)]
    pub max_leverage: u32,
}

impl MetaResponse {
    pub fn into_assets(self) -> Vec<AssetMeta> {
        self.universe
            .into_iter()
            .enumerate()
            .map(|(index, info)| AssetMeta {
                index: index as u32,
                name: info.name,
                sz_decimals: info.sz_decimals,
                max_leverage: info.max_leverage,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    pub margin_summary: MarginSummary,
    pub asset_positions: Vec<AssetPosition>,
    pub withdrawable: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
    pub total_ntl_pos: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AssetPosition {
    pub position: PositionWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionWire {
    pub coin: String,
    pub szi: Decimal,
    pub entry_px: Option<Decimal>,
    pub position_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub liquidation_px: Option<Decimal>,
    #[serde(default)]
    pub leverage: Option<LeverageWire>,
}

#[derive(Debug, Deserialize)]
pub struct LeverageWire {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: u32,
}

impl ClearinghouseState {
    pub fn into_account_state(self, address: String) -> AccountState {
        AccountState {
            address,
            account_value: self.margin_summary.account_value,
            total_margin_used: self.margin_summary.total_margin_used,
            total_notional_position: self.margin_summary.total_ntl_pos,
            withdrawable: self.withdrawable,
            positions: self
                .asset_positions
                .into_iter()
                .map(|p| {
                    let pos = p.position;
                    Position {
                        symbol: pos.coin,
                        size: pos.szi,
                        entry_price: pos.entry_px,
                        position_value: pos.position_value,
                        unrealized_pnl: pos.unrealized_pnl,
                        liquidation_price: pos.liquidation_px,
                        leverage: pos.leverage.as_ref().map(|l| l.value),
                        margin_mode: pos.leverage.map(|l| l.kind),
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderWire {
    pub coin: String,
    /// "B" bid, "A" ask
    pub side: String,
    pub limit_px: Decimal,
    pub sz: Decimal,
    pub oid: u64,
    pub timestamp: u64,
}

impl OpenOrderWire {
    pub fn into_open_order(self) -> Result<OpenOrder, ClientError> {
        let side = match self.side.as_str() {
            "B" => Side::Buy,
            "A" => Side::Sell,
            other => {
                return Err(ClientError::Decode(format!(
                    "order {} has unknown side '{}'",
                    self.oid, other
                )))
            }
        };
        Ok(OpenOrder {
            symbol: self.coin,
            side,
            price: self.limit_px,
            size: self.sz,
            order_id: self.oid,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct L2BookResponse {
    pub coin: String,
    pub time: u64,
    pub levels: Vec<Vec<L2LevelWire>>,
}

#[derive(Debug, Deserialize)]
pub struct L2LevelWire {
    pub px: Decimal,
    pub sz: Decimal,
    pub n: u32,
}

impl L2BookResponse {
    pub fn into_order_book(self) -> OrderBook {
        let mut levels = self.levels.into_iter().map(|side| {
            side.into_iter()
                .map(|l| BookLevel {
                    price: l.px,
                    size: l.sz,
                    orders: l.n,
                })
                .collect::<Vec<_>>()
        });
        let bids = levels.next().unwrap_or_default();
        let asks = levels.next().unwrap_or_default();

        OrderBook {
            symbol: self.coin,
            time: self.time,
            bids,
            asks,
        }
    }
}
