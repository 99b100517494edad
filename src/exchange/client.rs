use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::nonce::NonceSource;
use super::signing;
use super::types::{
    AccountState, AssetMeta, CancelOutcome, CancelRequest, OpenOrder, OrderAck, OrderBook,
    OrderKind, OrderRequest, OrderStatus, TimeInForce,
};
use super::wire::{
    Action, AllMids, BulkCancel, BulkOrder, CancelWire, ClearinghouseState, ExchangeDataStatus,
    ExchangePayload, ExchangeResponse, ExchangeResponseStatus, L2BookResponse, LimitWire,
    MetaResponse, OpenOrderWire, OrderTypeWire, OrderWire,
};
use super::{ClientError, ExchangeClient};
use crate::credential::Credential;
use crate::network::NetworkContext;
use crate::precision;

const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the Hyperliquid `/info` and `/exchange` endpoints.
///
/// Holds no network of its own: every call is told which deployment to hit.
pub struct HyperliquidClient {
    http: reqwest::Client,
    nonces: NonceSource,
    market_slippage: Decimal,
}

impl HyperliquidClient {
    pub fn new(market_slippage: Decimal) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hyperliquid-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HyperliquidClient {
            http,
            nonces: NonceSource::new(),
            market_slippage,
        })
    }

    async fn post<B, T>(&self, url: String, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            ClientError::Http(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by {}", url);
            return Err(ClientError::RateLimited(truncate(&text)));
        }
        if !status.is_success() {
            warn!("{} returned HTTP {}", url, status);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("{} (body: {})", e, truncate(&text))))
    }

    async fn info<T: DeserializeOwned>(
        &self,
        network: &NetworkContext,
        request: Value,
    ) -> Result<T, ClientError> {
        debug!("Info request: {}", request);
        self.post(network.info_url(), &request).await
    }

    /// Sign and post one action; `status: "err"` becomes a rejection.
    async fn post_action(
        &self,
        credential: &Credential,
        network: &NetworkContext,
        action: &Action,
    ) -> Result<ExchangeResponse, ClientError> {
        let nonce = self.nonces.next();
        let signature = signing::sign_l1_action(credential, network, action, nonce)?;
        let payload = ExchangePayload {
            action,
            nonce,
            signature,
            vault_address: None,
        };

        debug!("Posting signed action (nonce: {}) to {}", nonce, network);
        match self.post(network.exchange_url(), &payload).await? {
            ExchangeResponseStatus::Ok(response) => {
                debug!("Exchange accepted {} action", response.kind);
                Ok(response)
            }
            ExchangeResponseStatus::Err(message) => {
                warn!("Exchange rejected action: {}", message);
                Err(ClientError::Rejected(message))
            }
        }
    }

    async fn limit_price_for(
        &self,
        network: &NetworkContext,
        order: &OrderRequest,
    ) -> Result<(Decimal, TimeInForce), ClientError> {
        match order.kind {
            OrderKind::Limit { price, tif } => Ok((price, tif)),
            OrderKind::Market => {
                let mid = self.get_price(network, &order.asset.name).await?;
                let price = precision::market_price(
                    mid,
                    order.side.is_buy(),
                    self.market_slippage,
                    order.asset.sz_decimals,
                )
                .map_err(|e| ClientError::Decode(format!("cannot derive market price: {}", e)))?;
                debug!(
                    "Market order on {} priced at {} (mid {})",
                    order.asset.name, price, mid
                );
                Ok((price, TimeInForce::Ioc))
            }
        }
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

fn user_param(address: Address) -> String {
    address.to_string().to_lowercase()
}

#[async_trait]
impl ExchangeClient for HyperliquidClient {
    async fn get_price(
        &self,
        network: &NetworkContext,
        symbol: &str,
    ) -> Result<Decimal, ClientError> {
        let mids: AllMids = self.info(network, json!({ "type": "allMids" })).await?;
        mids.get(symbol)
            .or_else(|| {
                mids.iter()
                    .find(|(coin, _)| coin.eq_ignore_ascii_case(symbol))
                    .map(|(_, mid)| mid)
            })
            .copied()
            .ok_or_else(|| ClientError::UnknownSymbol(symbol.to_string()))
    }

    async fn get_order_book(
        &self,
        network: &NetworkContext,
        symbol: &str,
    ) -> Result<OrderBook, ClientError> {
        // l2Book 的 coin 区分大小写（如 kPEPE），先按资产列表取规范名称
        let coin = self.get_asset(network, symbol).await?.name;
        let book: Option<L2BookResponse> = self
            .info(network, json!({ "type": "l2Book", "coin": coin }))
            .await?;
        book.map(L2BookResponse::into_order_book)
            .ok_or(ClientError::UnknownSymbol(coin))
    }

    async fn get_account_state(
        &self,
        network: &NetworkContext,
        address: Address,
    ) -> Result<AccountState, ClientError> {
        let state: ClearinghouseState = self
            .info(
                network,
                json!({ "type": "clearinghouseState", "user": user_param(address) }),
            )
            .await?;
        Ok(state.into_account_state(address.to_string()))
    }

    async fn get_open_orders(
        &self,
        network: &NetworkContext,
        address: Address,
    ) -> Result<Vec<OpenOrder>, ClientError> {
        let orders: Vec<OpenOrderWire> = self
            .info(
                network,
                json!({ "type": "openOrders", "user": user_param(address) }),
            )
            .await?;
        orders
            .into_iter()
            .map(OpenOrderWire::into_open_order)
            .collect()
    }

    async fn get_assets(&self, network: &NetworkContext) -> Result<Vec<AssetMeta>, ClientError> {
        let meta: MetaResponse = self.info(network, json!({ "type": "meta" })).await?;
        Ok(meta.into_assets())
    }

    async fn submit_order(
        &self,
        credential: &Credential,
        network: &NetworkContext,
        order: &OrderRequest,
    ) -> Result<OrderAck, ClientError> {
        let (price, tif) = self.limit_price_for(network, order).await?;

        let action = Action::Order(BulkOrder {
            orders: vec![OrderWire {
                a: order.asset.index,
                b: order.side.is_buy(),
                p: precision::to_wire(price),
                s: precision::to_wire(order.size),
                r: order.reduce_only,
                t: OrderTypeWire::Limit(LimitWire {
                    tif: tif.wire_name().to_string(),
                }),
            }],
            grouping: "na".to_string(),
        });

        info!(
            "Submitting {:?} order: {} {} @ {} ({})",
            order.side,
            order.size,
            order.asset.name,
            price,
            tif.wire_name()
        );

        let response = self.post_action(credential, network, &action).await?;
        let status = response
            .data
            .and_then(|data| data.statuses.into_iter().next())
            .ok_or_else(|| ClientError::Decode("order response without status".to_string()))?;

        match status {
            ExchangeDataStatus::Resting(resting) => Ok(OrderAck {
                order_id: Some(resting.oid),
                status: OrderStatus::Resting,
            }),
            ExchangeDataStatus::Filled(filled) => Ok(OrderAck {
                order_id: Some(filled.oid),
                status: OrderStatus::Filled {
                    filled_size: filled.total_sz,
                    average_price: filled.avg_px,
                },
            }),
            ExchangeDataStatus::WaitingForFill => Ok(OrderAck {
                order_id: None,
                status: OrderStatus::WaitingForFill,
            }),
            ExchangeDataStatus::WaitingForTrigger => Ok(OrderAck {
                order_id: None,
                status: OrderStatus::WaitingForTrigger,
            }),
            ExchangeDataStatus::Error(message) => Err(ClientError::Rejected(message)),
            ExchangeDataStatus::Success => Err(ClientError::Decode(
                "unexpected 'success' status for an order".to_string(),
            )),
        }
    }

    async fn cancel_orders(
        &self,
        credential: &Credential,
        network: &NetworkContext,
        cancels: &[CancelRequest],
    ) -> Result<Vec<CancelOutcome>, ClientError> {
        if cancels.is_empty() {
            return Ok(Vec::new());
        }

        let action = Action::Cancel(BulkCancel {
            cancels: cancels
                .iter()
                .map(|c| CancelWire {
                    a: c.asset,
                    o: c.order_id,
                })
                .collect(),
        });

        info!("Submitting cancel for {} order(s)", cancels.len());

        let response = self.post_action(credential, network, &action).await?;
        let statuses = response
            .data
            .map(|data| data.statuses)
            .ok_or_else(|| ClientError::Decode("cancel response without statuses".to_string()))?;

        if statuses.len() != cancels.len() {
            return Err(ClientError::Decode(format!(
                "expected {} cancel statuses, got {}",
                cancels.len(),
                statuses.len()
            )));
        }

        Ok(statuses
            .into_iter()
            .map(|status| match status {
                ExchangeDataStatus::Success => CancelOutcome::Cancelled,
                ExchangeDataStatus::Error(message) => CancelOutcome::Failed(message),
                other => CancelOutcome::Failed(format!("unexpected status {:?}", other)),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::tests::TEST_KEY;
    use crate::exchange::types::Side;
    use crate::network::Network;
    use mockito::Matcher;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn btc() -> AssetMeta {
        AssetMeta {
            index: 0,
            name: "BTC".to_string(),
            sz_decimals: 5,
            max_leverage: 50,
        }
    }

    fn setup(server: &mockito::ServerGuard) -> (HyperliquidClient, NetworkContext, Credential) {
        let client = HyperliquidClient::new(dec("0.05")).unwrap();
        let network = NetworkContext::with_endpoint(Network::Testnet, &server.url()).unwrap();
        let credential = Credential::from_hex(TEST_KEY).unwrap();
        (client, network, credential)
    }

    #[tokio::test]
    async fn test_get_price() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "allMids"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"BTC":"50000.12","ETH":"2500.5"}"#)
            .create_async()
            .await;

        let (client, network, _) = setup(&server);
        let price = client.get_price(&network, "BTC").await.unwrap();
        assert_eq!(price, dec("50000.12"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_price_unknown_symbol() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .with_status(200)
            .with_body(r#"{"BTC":"50000.12"}"#)
            .create_async()
            .await;

        let (client, network, _) = setup(&server);
        let err = client.get_price(&network, "DOGE").await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownSymbol(ref s) if s == "DOGE"));
    }

    #[tokio::test]
    async fn test_rate_limit_and_server_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "allMids"})))
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;
        server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "meta"})))
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let (client, network, _) = setup(&server);
        let err = client.get_price(&network, "BTC").await.unwrap_err();
        assert!(matches!(err, ClientError::RateLimited(_)));

        let err = client.get_assets(&network).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_get_asset_from_meta() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "meta"})))
            .with_status(200)
            .with_body(
                r#"{"universe":[{"name":"BTC","szDecimals":5,"maxLeverage":50},{"name":"ETH","szDecimals":4,"maxLeverage":50}]}"#,
            )
            .expect(3)
            .create_async()
            .await;

        let (client, network, _) = setup(&server);
        let eth = client.get_asset(&network, "ETH").await.unwrap();
        assert_eq!(eth.index, 1);
        let btc = client.get_asset(&network, "btc").await.unwrap();
        assert_eq!(btc.name, "BTC");
        assert!(matches!(
            client.get_asset(&network, "XYZ").await,
            Err(ClientError::UnknownSymbol(_))
        ));
    }

    #[tokio::test]
    async fn test_order_book_uses_canonical_coin_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "meta"})))
            .with_status(200)
            .with_body(
                r#"{"universe":[{"name":"BTC","szDecimals":5,"maxLeverage":50},{"name":"kPEPE","szDecimals":0,"maxLeverage":10}]}"#,
            )
            .expect(2)
            .create_async()
            .await;
        let book_mock = server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "l2Book", "coin": "kPEPE"})))
            .with_status(200)
            .with_body(
                r#"{"coin":"kPEPE","time":1,"levels":[[{"px":"0.012","sz":"1000","n":2}],[{"px":"0.0121","sz":"500","n":1}]]}"#,
            )
            .create_async()
            .await;

        let (client, network, _) = setup(&server);
        let book = client.get_order_book(&network, "KPEPE").await.unwrap();
        assert_eq!(book.symbol, "kPEPE");
        assert_eq!(book.bids[0].price, dec("0.012"));
        book_mock.assert_async().await;

        assert!(matches!(
            client.get_order_book(&network, "DOGE").await,
            Err(ClientError::UnknownSymbol(ref s)) if s == "DOGE"
        ));
    }

    #[tokio::test]
    async fn test_get_account_state_sends_lowercase_user() {
        let mut server = mockito::Server::new_async().await;
        let address = Credential::from_hex(TEST_KEY).unwrap().address();
        let mock = server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({
                "type": "clearinghouseState",
                "user": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
            })))
            .with_status(200)
            .with_body(
                r#"{"assetPositions":[],"marginSummary":{"accountValue":"100.5","totalMarginUsed":"0","totalNtlPos":"0","totalRawUsd":"100.5"},"withdrawable":"100.5","time":1}"#,
            )
            .create_async()
            .await;

        let (client, network, _) = setup(&server);
        let state = client.get_account_state(&network, address).await.unwrap();
        assert_eq!(state.account_value, dec("100.5"));
        assert!(state.positions.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_limit_order_resting() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/exchange")
            .match_body(Matcher::PartialJson(json!({
                "action": {
                    "type": "order",
                    "grouping": "na",
                    "orders": [{"a": 0, "b": true, "p": "50000", "s": "0.01", "r": false,
                                "t": {"limit": {"tif": "Gtc"}}}]
                },
                "vaultAddress": null
            })))
            .with_status(200)
            .with_body(
                r#"{"status":"ok","response":{"type":"order","data":{"statuses":[{"resting":{"oid":77738308}}]}}}"#,
            )
            .create_async()
            .await;

        let (client, network, credential) = setup(&server);
        let order = OrderRequest {
            asset: btc(),
            side: Side::Buy,
            size: dec("0.01"),
            kind: OrderKind::Limit {
                price: dec("50000.0"),
                tif: TimeInForce::Gtc,
            },
            reduce_only: false,
        };
        let ack = client
            .submit_order(&credential, &network, &order)
            .await
            .unwrap();
        assert_eq!(ack.order_id, Some(77738308));
        assert_eq!(ack.status, OrderStatus::Resting);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_market_order_uses_slippage_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .match_body(Matcher::PartialJson(json!({"type": "allMids"})))
            .with_status(200)
            .with_body(r#"{"BTC":"50000"}"#)
            .create_async()
            .await;
        let exchange = server
            .mock("POST", "/exchange")
            .match_body(Matcher::PartialJson(json!({
                "action": {
                    "orders": [{"a": 0, "b": false, "p": "47500", "s": "0.5", "r": true,
                                "t": {"limit": {"tif": "Ioc"}}}]
                }
            })))
            .with_status(200)
            .with_body(
                r#"{"status":"ok","response":{"type":"order","data":{"statuses":[{"filled":{"totalSz":"0.5","avgPx":"49990.1","oid":1}}]}}}"#,
            )
            .create_async()
            .await;

        let (client, network, credential) = setup(&server);
        let order = OrderRequest {
            asset: btc(),
            side: Side::Sell,
            size: dec("0.5"),
            kind: OrderKind::Market,
            reduce_only: true,
        };
        let ack = client
            .submit_order(&credential, &network, &order)
            .await
            .unwrap();
        assert_eq!(
            ack.status,
            OrderStatus::Filled {
                filled_size: dec("0.5"),
                average_price: dec("49990.1"),
            }
        );
        exchange.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_order_rejections() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/exchange")
            .with_status(200)
            .with_body(
                r#"{"status":"ok","response":{"type":"order","data":{"statuses":[{"error":"Insufficient margin to place order. asset=0"}]}}}"#,
            )
            .create_async()
            .await;

        let (client, network, credential) = setup(&server);
        let order = OrderRequest {
            asset: btc(),
            side: Side::Buy,
            size: dec("1"),
            kind: OrderKind::Limit {
                price: dec("50000"),
                tif: TimeInForce::Alo,
            },
            reduce_only: false,
        };
        let err = client
            .submit_order(&credential, &network, &order)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m.starts_with("Insufficient margin")));
    }

    #[tokio::test]
    async fn test_action_level_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/exchange")
            .with_status(200)
            .with_body(r#"{"status":"err","response":"User or API Wallet does not exist."}"#)
            .create_async()
            .await;

        let (client, network, credential) = setup(&server);
        let cancel = CancelRequest {
            asset: 0,
            symbol: "BTC".to_string(),
            order_id: 5,
        };
        let err = client
            .cancel_order(&credential, &network, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_cancel_orders_mixed_outcomes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/exchange")
            .match_body(Matcher::PartialJson(json!({
                "action": {"type": "cancel", "cancels": [{"a": 0, "o": 1}, {"a": 1, "o": 2}]}
            })))
            .with_status(200)
            .with_body(
                r#"{"status":"ok","response":{"type":"cancel","data":{"statuses":["success",{"error":"Order was never placed, already canceled, or filled."}]}}}"#,
            )
            .create_async()
            .await;

        let (client, network, credential) = setup(&server);
        let cancels = vec![
            CancelRequest {
                asset: 0,
                symbol: "BTC".to_string(),
                order_id: 1,
            },
            CancelRequest {
                asset: 1,
                symbol: "ETH".to_string(),
                order_id: 2,
            },
        ];
        let outcomes = client
            .cancel_orders(&credential, &network, &cancels)
            .await
            .unwrap();
        assert_eq!(outcomes[0], CancelOutcome::Cancelled);
        assert!(matches!(outcomes[1], CancelOutcome::Failed(ref m) if m.contains("never placed")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancel_orders_empty_is_noop() {
        let server = mockito::Server::new_async().await;
        let (client, network, credential) = setup(&server);
        let outcomes = client
            .cancel_orders(&credential, &network, &[])
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        assert!(truncate(&body).chars().count() <= MAX_ERROR_BODY + 1);
        assert_eq!(truncate("short"), "short");
    }
}
