use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::info;

use super::adapter::{to_payload, ExchangeAdapter, ReadContext};
use super::catalog::DEFAULT_BOOK_DEPTH;
use super::schema::ValidatedArgs;
use crate::error::{ExchangeError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRequest {
    // 市场代码，大小写由交易所资产列表解析
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookRequest {
    pub symbol: String,
    // 每一侧返回的档位数
    #[serde(default = "default_depth")]
    pub depth: u64,
}

fn default_depth() -> u64 {
    DEFAULT_BOOK_DEPTH
}

impl ExchangeAdapter {
    /// 查询中间价，结果为 JSON 数字，保留交易所返回的全部小数位
    pub(crate) async fn get_price(&self, args: &ValidatedArgs, ctx: &ReadContext) -> Result<Value> {
        let request: PriceRequest = args.parse()?;

        let price = self
            .read("get_price", || {
                self.client.get_price(&ctx.network, &request.symbol)
            })
            .await?;

        info!("{} 中间价: {}", request.symbol, price);
        let number = Number::from_str(&price.normalize().to_string()).map_err(|e| {
            ExchangeError::Internal(format!("price {} is not a JSON number: {}", price, e))
        })?;
        Ok(Value::Number(number))
    }

    /// 查询 L2 订单簿快照并按深度截断
    pub(crate) async fn get_order_book(
        &self,
        args: &ValidatedArgs,
        ctx: &ReadContext,
    ) -> Result<Value> {
        let request: OrderBookRequest = args.parse()?;

        let mut book = self
            .read("get_order_book", || {
                self.client.get_order_book(&ctx.network, &request.symbol)
            })
            .await?;

        let depth = request.depth as usize;
        book.bids.truncate(depth);
        book.asks.truncate(depth);

        info!(
            "{} 订单簿: {} bids / {} asks",
            book.symbol,
            book.bids.len(),
            book.asks.len()
        );
        to_payload(&book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::stub::StubExchange;
    use crate::network::{Network, NetworkContext};
    use crate::tools::catalog::ToolCatalog;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (ExchangeAdapter, ReadContext) {
        let adapter = ExchangeAdapter::new(
            Arc::new(StubExchange::new()),
            Duration::from_secs(1),
            3,
        );
        let ctx = ReadContext {
            network: NetworkContext::new(Network::Testnet),
            account: None,
        };
        (adapter, ctx)
    }

    fn args(tool: &str, raw: Value) -> ValidatedArgs {
        let catalog = ToolCatalog::standard().unwrap();
        catalog.get(tool).unwrap().input_schema.validate(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_get_price_returns_exact_number() {
        let (adapter, ctx) = setup();
        let payload = adapter
            .get_price(&args("get_price", json!({"symbol": "btc"})), &ctx)
            .await
            .unwrap();
        assert_eq!(payload, json!(50000.12));
        assert_eq!(serde_json::to_string(&payload).unwrap(), "50000.12");
    }

    #[tokio::test]
    async fn test_order_book_depth() {
        let (adapter, ctx) = setup();
        let payload = adapter
            .get_order_book(&args("get_order_book", json!({"symbol": "ETH"})), &ctx)
            .await
            .unwrap();
        assert_eq!(payload["symbol"], "ETH");
        assert_eq!(payload["bids"].as_array().unwrap().len(), 5);

        let payload = adapter
            .get_order_book(
                &args("get_order_book", json!({"symbol": "ETH", "depth": 2})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(payload["asks"].as_array().unwrap().len(), 2);
        assert_eq!(payload["asks"][0]["price"], "2501.5");
    }
}
