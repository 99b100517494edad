use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::adapter::{to_payload, ExchangeAdapter, ReadContext};
use super::schema::ValidatedArgs;
use crate::error::Result;
use crate::exchange::OpenOrder;

#[derive(Debug, Clone, Deserialize)]
pub struct AccountStateRequest {
    // 不传则使用配置的默认账户
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrdersRequest {
    #[serde(default)]
    pub address: Option<Address>,
    // 只返回该市场的挂单
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenOrdersResponse {
    pub address: String,
    pub orders: Vec<OpenOrder>,
}

impl ExchangeAdapter {
    /// 查询账户保证金概况和持仓
    pub(crate) async fn get_account_state(
        &self,
        args: &ValidatedArgs,
        ctx: &ReadContext,
    ) -> Result<Value> {
        let request: AccountStateRequest = args.parse()?;
        let address = ctx.account_or(request.address)?;

        let state = self
            .read("get_account_state", || {
                self.client.get_account_state(&ctx.network, address)
            })
            .await?;

        info!(
            "账户 {} 净值: {}, 持仓数: {}",
            address,
            state.account_value,
            state.positions.len()
        );
        to_payload(&state)
    }

    /// 查询账户当前挂单
    pub(crate) async fn get_open_orders(
        &self,
        args: &ValidatedArgs,
        ctx: &ReadContext,
    ) -> Result<Value> {
        let request: OpenOrdersRequest = args.parse()?;
        let address = ctx.account_or(request.address)?;

        let mut orders = self
            .read("get_open_orders", || {
                self.client.get_open_orders(&ctx.network, address)
            })
            .await?;

        if let Some(symbol) = &request.symbol {
            orders.retain(|o| o.symbol.eq_ignore_ascii_case(symbol));
        }

        info!("账户 {} 挂单数: {}", address, orders.len());
        to_payload(&OpenOrdersResponse {
            address: address.to_string(),
            orders,
        })
    }
}
