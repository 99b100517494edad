use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::adapter::{to_payload, ExchangeAdapter};
use super::schema::ValidatedArgs;
use crate::credential::SigningContext;
use crate::error::{ExchangeError, Result};
use crate::exchange::{
    CancelOutcome, CancelRequest, OrderKind, OrderRequest, OrderStatus, Side, TimeInForce,
};
use crate::precision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    // 不传时：有 price 视为限价单，否则为市价单
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub reduce_only: bool,
}

impl PlaceOrderRequest {
    /// 校验字段之间的约束，返回订单类型
    fn resolve_kind(&self) -> Result<(OrderType, Option<Decimal>)> {
        let order_type = self.order_type.unwrap_or(if self.price.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        });

        match (order_type, self.price) {
            (OrderType::Limit, None) => Err(ExchangeError::InvalidArguments(
                "limit orders require 'price'".to_string(),
            )),
            (OrderType::Market, Some(_)) => Err(ExchangeError::InvalidArguments(
                "market orders must not set 'price'".to_string(),
            )),
            (OrderType::Market, None) if self.time_in_force.is_some() => {
                Err(ExchangeError::InvalidArguments(
                    "'time_in_force' only applies to limit orders".to_string(),
                ))
            }
            (order_type, price) => Ok((order_type, price)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderResponse {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub order_type: OrderType,
    // status 以及成交时的 filled_size / average_price
    #[serde(flatten)]
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderRequest {
    pub symbol: String,
    pub order_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderResponse {
    pub symbol: String,
    pub order_id: u64,
    pub status: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAllRequest {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelFailure {
    pub order_id: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelAllResponse {
    pub requested: usize,
    pub cancelled: usize,
    pub failures: Vec<CancelFailure>,
}

impl ExchangeAdapter {
    /// 下单：先校验参数和精度，再签名提交，只提交一次
    pub(crate) async fn place_order(
        &self,
        args: &ValidatedArgs,
        ctx: &SigningContext,
    ) -> Result<Value> {
        let request: PlaceOrderRequest = args.parse()?;
        let (order_type, price) = request.resolve_kind()?;

        let asset = self
            .read("get_asset", || {
                self.client.get_asset(&ctx.network, &request.symbol)
            })
            .await?;

        precision::check_size(request.size, asset.sz_decimals)?;
        let kind = match price {
            Some(price) => {
                precision::check_price(price, asset.sz_decimals)?;
                OrderKind::Limit {
                    price,
                    tif: request.time_in_force.unwrap_or_default(),
                }
            }
            None => OrderKind::Market,
        };

        let order = OrderRequest {
            asset,
            side: request.side,
            size: request.size,
            kind,
            reduce_only: request.reduce_only,
        };

        info!(
            "下单: {:?} {} {} ({:?}) on {}",
            order.side,
            order.size,
            order.asset.name,
            order_type,
            ctx.network
        );

        let ack = self
            .bounded(
                self.client
                    .submit_order(&ctx.credential, &ctx.network, &order),
            )
            .await?;

        info!("订单已提交: status={:?}, oid={:?}", ack.status, ack.order_id);

        to_payload(&PlaceOrderResponse {
            symbol: order.asset.name,
            side: order.side,
            size: order.size,
            price,
            order_type,
            status: ack.status,
            order_id: ack.order_id,
        })
    }

    /// 撤销单个订单
    pub(crate) async fn cancel_order(
        &self,
        args: &ValidatedArgs,
        ctx: &SigningContext,
    ) -> Result<Value> {
        let request: CancelOrderRequest = args.parse()?;

        let asset = self
            .read("get_asset", || {
                self.client.get_asset(&ctx.network, &request.symbol)
            })
            .await?;

        let cancel = CancelRequest {
            asset: asset.index,
            symbol: asset.name,
            order_id: request.order_id,
        };

        info!("撤单: {} oid={}", cancel.symbol, cancel.order_id);

        let outcome = self
            .bounded(
                self.client
                    .cancel_order(&ctx.credential, &ctx.network, &cancel),
            )
            .await?;

        match outcome {
            CancelOutcome::Cancelled => to_payload(&CancelOrderResponse {
                symbol: cancel.symbol,
                order_id: cancel.order_id,
                status: "cancelled",
            }),
            CancelOutcome::Failed(message) => {
                warn!("撤单失败 oid={}: {}", cancel.order_id, message);
                Err(ExchangeError::Rejected(message))
            }
        }
    }

    /// 撤销交易账户的全部挂单（可按市场过滤），一次签名批量提交
    pub(crate) async fn cancel_all_orders(
        &self,
        args: &ValidatedArgs,
        ctx: &SigningContext,
    ) -> Result<Value> {
        let request: CancelAllRequest = args.parse()?;
        let address = ctx.credential.address();

        let mut orders = self
            .read("get_open_orders", || {
                self.client.get_open_orders(&ctx.network, address)
            })
            .await?;
        if let Some(symbol) = &request.symbol {
            orders.retain(|o| o.symbol.eq_ignore_ascii_case(symbol));
        }

        if orders.is_empty() {
            info!("没有需要撤销的挂单");
            return to_payload(&CancelAllResponse {
                requested: 0,
                cancelled: 0,
                failures: Vec::new(),
            });
        }

        let assets = self
            .read("get_assets", || self.client.get_assets(&ctx.network))
            .await?;

        let mut failures = Vec::new();
        let mut cancels = Vec::with_capacity(orders.len());
        for order in &orders {
            match assets.iter().find(|a| a.name == order.symbol) {
                Some(asset) => cancels.push(CancelRequest {
                    asset: asset.index,
                    symbol: order.symbol.clone(),
                    order_id: order.order_id,
                }),
                None => failures.push(CancelFailure {
                    order_id: order.order_id,
                    message: format!("unknown symbol: {}", order.symbol),
                }),
            }
        }

        info!("批量撤单: {} 个订单", cancels.len());

        let outcomes = if cancels.is_empty() {
            Vec::new()
        } else {
            self.bounded(
                self.client
                    .cancel_orders(&ctx.credential, &ctx.network, &cancels),
            )
            .await?
        };

        let mut cancelled = 0;
        for (cancel, outcome) in cancels.iter().zip(outcomes) {
            match outcome {
                CancelOutcome::Cancelled => cancelled += 1,
                CancelOutcome::Failed(message) => failures.push(CancelFailure {
                    order_id: cancel.order_id,
                    message,
                }),
            }
        }

        if !failures.is_empty() {
            warn!("{} 个订单撤销失败", failures.len());
        }

        to_payload(&CancelAllResponse {
            requested: orders.len(),
            cancelled,
            failures,
        })
    }
}
