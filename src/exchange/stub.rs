//! Scripted `ExchangeClient` for tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::types::{
    AccountState, AssetMeta, CancelOutcome, CancelRequest, OpenOrder, OrderAck, OrderBook,
    OrderRequest, OrderStatus,
};
use super::{ClientError, ExchangeClient};
use crate::credential::Credential;
use crate::network::NetworkContext;

pub(crate) struct StubExchange {
    pub mids: HashMap<String, Decimal>,
    pub assets: Vec<AssetMeta>,
    pub open_orders: Vec<OpenOrder>,
    pub order_error: Option<String>,
    pub cancel_failures: HashMap<u64, String>,
    pub delay: Option<Duration>,
    pub write_delay: Option<Duration>,
    transient_failures: AtomicUsize,
    pub reads: AtomicUsize,
    pub submits: AtomicUsize,
    pub cancels: AtomicUsize,
    pub last_order: Mutex<Option<OrderRequest>>,
    pub last_network: Mutex<Option<NetworkContext>>,
}

impl StubExchange {
    pub fn new() -> Self {
        let mut mids = HashMap::new();
        mids.insert("BTC".to_string(), dec("50000.12"));
        mids.insert("ETH".to_string(), dec("2500.5"));

        StubExchange {
            mids,
            assets: vec![
                AssetMeta {
                    index: 0,
                    name: "BTC".to_string(),
                    sz_decimals: 5,
                    max_leverage: 50,
                },
                AssetMeta {
                    index: 1,
                    name: "ETH".to_string(),
                    sz_decimals: 4,
                    max_leverage: 50,
                },
            ],
            open_orders: Vec::new(),
            order_error: None,
            cancel_failures: HashMap::new(),
            delay: None,
            write_delay: None,
            transient_failures: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            last_order: Mutex::new(None),
            last_network: Mutex::new(None),
        }
    }

    pub fn with_order_error(mut self, message: &str) -> Self {
        self.order_error = Some(message.to_string());
        self
    }

    /// Delay every call, reads and writes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self.write_delay = Some(delay);
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// The next `count` reads fail with a 503.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_open_orders(mut self, orders: Vec<OpenOrder>) -> Self {
        self.open_orders = orders;
        self
    }

    pub fn with_cancel_failure(mut self, order_id: u64, message: &str) -> Self {
        self.cancel_failures.insert(order_id, message.to_string());
        self
    }

    /// Mid and canonical name, matched like the real client.
    fn mid(&self, symbol: &str) -> Result<(String, Decimal), ClientError> {
        self.mids
            .iter()
            .find(|(coin, _)| coin.eq_ignore_ascii_case(symbol))
            .map(|(coin, mid)| (coin.clone(), *mid))
            .ok_or_else(|| ClientError::UnknownSymbol(symbol.to_string()))
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.submits.load(Ordering::SeqCst) + self.cancels.load(Ordering::SeqCst)
    }

    async fn read(&self, network: &NetworkContext) -> Result<(), ClientError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *self.last_network.lock().unwrap() = Some(network.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ClientError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn write(&self, network: &NetworkContext) {
        *self.last_network.lock().unwrap() = Some(network.clone());
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub(crate) fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[async_trait]
impl ExchangeClient for StubExchange {
    async fn get_price(
        &self,
        network: &NetworkContext,
        symbol: &str,
    ) -> Result<Decimal, ClientError> {
        self.read(network).await?;
        self.mid(symbol).map(|(_, mid)| mid)
    }

    async fn get_order_book(
        &self,
        network: &NetworkContext,
        symbol: &str,
    ) -> Result<OrderBook, ClientError> {
        self.read(network).await?;
        let (coin, mid) = self.mid(symbol)?;
        let level = |offset: i64| super::types::BookLevel {
            price: mid + Decimal::from(offset),
            size: Decimal::ONE,
            orders: 1,
        };
        Ok(OrderBook {
            symbol: coin,
            time: 1_700_000_000_000,
            bids: (1..=10).map(|i| level(-i)).collect(),
            asks: (1..=10).map(level).collect(),
        })
    }

    async fn get_account_state(
        &self,
        network: &NetworkContext,
        address: Address,
    ) -> Result<AccountState, ClientError> {
        self.read(network).await?;
        Ok(AccountState {
            address: address.to_string(),
            account_value: dec("1000"),
            total_margin_used: Decimal::ZERO,
            total_notional_position: Decimal::ZERO,
            withdrawable: dec("1000"),
            positions: Vec::new(),
        })
    }

    async fn get_open_orders(
        &self,
        network: &NetworkContext,
        _address: Address,
    ) -> Result<Vec<OpenOrder>, ClientError> {
        self.read(network).await?;
        Ok(self.open_orders.clone())
    }

    async fn get_assets(&self, network: &NetworkContext) -> Result<Vec<AssetMeta>, ClientError> {
        self.read(network).await?;
        Ok(self.assets.clone())
    }

    async fn submit_order(
        &self,
        _credential: &Credential,
        network: &NetworkContext,
        order: &OrderRequest,
    ) -> Result<OrderAck, ClientError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.write(network).await;
        *self.last_order.lock().unwrap() = Some(order.clone());

        if let Some(message) = &self.order_error {
            return Err(ClientError::Rejected(message.clone()));
        }
        Ok(OrderAck {
            order_id: Some(1001),
            status: OrderStatus::Resting,
        })
    }

    async fn cancel_orders(
        &self,
        _credential: &Credential,
        network: &NetworkContext,
        cancels: &[CancelRequest],
    ) -> Result<Vec<CancelOutcome>, ClientError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.write(network).await;
        Ok(cancels
            .iter()
            .map(|c| match self.cancel_failures.get(&c.order_id) {
                Some(message) => CancelOutcome::Failed(message.clone()),
                None => CancelOutcome::Cancelled,
            })
            .collect())
    }
}
