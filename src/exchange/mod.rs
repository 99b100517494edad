//! Exchange collaborator: the narrow interface the tool layer calls, plus the
//! Hyperliquid HTTP implementation behind it.

pub mod client;
pub mod nonce;
pub mod signing;
pub mod types;
pub mod wire;

#[cfg(test)]
pub(crate) mod stub;

use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::credential::Credential;
use crate::network::NetworkContext;

pub use client::HyperliquidClient;
pub use nonce::NonceSource;
pub use types::{
    AccountState, AssetMeta, BookLevel, CancelOutcome, CancelRequest, OpenOrder, OrderAck,
    OrderBook, OrderKind, OrderRequest, OrderStatus, Position, Side, TimeInForce,
};

/// Failures of the exchange client. Only the tool adapter sees these; it
/// converts every variant into an `ExchangeError`.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by exchange: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Rejected(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unexpected exchange response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Current mid price of a perpetual market.
    async fn get_price(&self, network: &NetworkContext, symbol: &str)
        -> Result<Decimal, ClientError>;

    async fn get_order_book(
        &self,
        network: &NetworkContext,
        symbol: &str,
    ) -> Result<OrderBook, ClientError>;

    async fn get_account_state(
        &self,
        network: &NetworkContext,
        address: Address,
    ) -> Result<AccountState, ClientError>;

    async fn get_open_orders(
        &self,
        network: &NetworkContext,
        address: Address,
    ) -> Result<Vec<OpenOrder>, ClientError>;

    /// The perpetual universe; an asset's index is its position here.
    async fn get_assets(&self, network: &NetworkContext) -> Result<Vec<AssetMeta>, ClientError>;

    /// Look up one asset. An exact name match wins; otherwise the match is
    /// case-insensitive, so `btc` finds `BTC` and `KPEPE` finds `kPEPE`.
    async fn get_asset(
        &self,
        network: &NetworkContext,
        symbol: &str,
    ) -> Result<AssetMeta, ClientError> {
        let assets = self.get_assets(network).await?;
        assets
            .iter()
            .find(|asset| asset.name == symbol)
            .or_else(|| {
                assets
                    .iter()
                    .find(|asset| asset.name.eq_ignore_ascii_case(symbol))
            })
            .cloned()
            .ok_or_else(|| ClientError::UnknownSymbol(symbol.to_string()))
    }

    /// Sign and submit one order; resolves once the exchange has accepted or
    /// rejected it.
    async fn submit_order(
        &self,
        credential: &Credential,
        network: &NetworkContext,
        order: &OrderRequest,
    ) -> Result<OrderAck, ClientError>;

    /// Sign and submit a batch of cancels as one action. Outcomes come back in
    /// request order.
    async fn cancel_orders(
        &self,
        credential: &Credential,
        network: &NetworkContext,
        cancels: &[CancelRequest],
    ) -> Result<Vec<CancelOutcome>, ClientError>;

    async fn cancel_order(
        &self,
        credential: &Credential,
        network: &NetworkContext,
        cancel: &CancelRequest,
    ) -> Result<CancelOutcome, ClientError> {
        self.cancel_orders(credential, network, std::slice::from_ref(cancel))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Decode("cancel returned no status".to_string()))
    }
}
