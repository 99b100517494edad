use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::catalog::{ReadOperation, WriteOperation};
use super::schema::ValidatedArgs;
use crate::credential::SigningContext;
use crate::error::{ExchangeError, Result};
use crate::exchange::{ClientError, ExchangeClient};
use crate::network::NetworkContext;
use crate::retry::retry_if;

/// Initial backoff between read attempts; doubles on each retry.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Everything a read operation may use. Holds no key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadContext {
    pub network: NetworkContext,
    /// Default account for account reads.
    pub account: Option<Address>,
}

impl ReadContext {
    /// The requested address, else the configured account.
    pub fn account_or(&self, requested: Option<Address>) -> Result<Address> {
        requested.or(self.account).ok_or_else(|| {
            ExchangeError::InvalidArguments(
                "no 'address' given and no default account is configured".to_string(),
            )
        })
    }
}

/// Translates tool operations into exchange client calls.
///
/// Every client call is bounded by `timeout`. Reads are retried on timeouts
/// and transport failures; writes run exactly once.
pub struct ExchangeAdapter {
    pub(crate) client: Arc<dyn ExchangeClient>,
    timeout: Duration,
    read_attempts: usize,
}

impl ExchangeAdapter {
    pub fn new(client: Arc<dyn ExchangeClient>, timeout: Duration, read_attempts: usize) -> Self {
        ExchangeAdapter {
            client,
            timeout,
            read_attempts: read_attempts.max(1),
        }
    }

    pub async fn invoke_read(
        &self,
        op: ReadOperation,
        args: &ValidatedArgs,
        ctx: &ReadContext,
    ) -> Result<Value> {
        match op {
            ReadOperation::GetPrice => self.get_price(args, ctx).await,
            ReadOperation::GetOrderBook => self.get_order_book(args, ctx).await,
            ReadOperation::GetAccountState => self.get_account_state(args, ctx).await,
            ReadOperation::GetOpenOrders => self.get_open_orders(args, ctx).await,
        }
    }

    pub async fn invoke_write(
        &self,
        op: WriteOperation,
        args: &ValidatedArgs,
        ctx: &SigningContext,
    ) -> Result<Value> {
        match op {
            WriteOperation::PlaceOrder => self.place_order(args, ctx).await,
            WriteOperation::CancelOrder => self.cancel_order(args, ctx).await,
            WriteOperation::CancelAllOrders => self.cancel_all_orders(args, ctx).await,
        }
    }

    /// Run one client call under the timeout.
    pub(crate) async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ClientError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| self.normalize(e)),
            Err(_) => {
                warn!("Exchange call timed out after {:?}", self.timeout);
                Err(ExchangeError::Timeout(self.timeout))
            }
        }
    }

    /// Run a side-effect-free client call, retrying transient failures.
    pub(crate) async fn read<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        retry_if(
            |attempt| {
                debug!("{} (attempt {}/{})", what, attempt, self.read_attempts);
                self.bounded(call())
            },
            self.read_attempts,
            READ_RETRY_DELAY,
            ExchangeError::is_retryable,
        )
        .await
    }

    /// Map a collaborator failure onto the error kinds seen by the agent.
    pub(crate) fn normalize(&self, err: ClientError) -> ExchangeError {
        let normalized = match err {
            ClientError::Http(e) if e.is_timeout() => ExchangeError::Timeout(self.timeout),
            ClientError::Http(e) if e.is_decode() => ExchangeError::Internal(e.to_string()),
            ClientError::Http(e) => ExchangeError::Transport(e.to_string()),
            ClientError::Status { status, body } if status >= 500 => {
                ExchangeError::Transport(format!("exchange returned HTTP {}: {}", status, body))
            }
            ClientError::Status { status, body } => {
                ExchangeError::Rejected(format!("exchange returned HTTP {}: {}", status, body))
            }
            ClientError::RateLimited(body) => {
                ExchangeError::Rejected(format!("rate limited by exchange: {}", body))
            }
            ClientError::Rejected(message) => ExchangeError::Rejected(message),
            ClientError::UnknownSymbol(symbol) => {
                ExchangeError::Rejected(format!("unknown symbol: {}", symbol))
            }
            ClientError::Signing(message) => ExchangeError::Internal(message),
            ClientError::Decode(message) => ExchangeError::Internal(message),
        };
        debug!("Normalized exchange error: {:?}", normalized);
        normalized
    }
}

pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ExchangeError::Internal(format!("failed to encode result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::stub::StubExchange;
    use crate::network::Network;

    fn adapter(stub: Arc<StubExchange>, timeout_ms: u64) -> ExchangeAdapter {
        ExchangeAdapter::new(stub, Duration::from_millis(timeout_ms), 3)
    }

    fn ctx() -> ReadContext {
        ReadContext {
            network: NetworkContext::new(Network::Testnet),
            account: None,
        }
    }

    #[tokio::test]
    async fn test_read_retries_transient_failures() {
        let stub = Arc::new(StubExchange::new().with_transient_failures(2));
        let adapter = adapter(Arc::clone(&stub), 1_000);
        let ctx = ctx();
        let price = adapter
            .read("get_price", || adapter.client.get_price(&ctx.network, "BTC"))
            .await
            .unwrap();
        assert_eq!(price.to_string(), "50000.12");
        assert_eq!(stub.reads(), 3);
    }

    #[tokio::test]
    async fn test_read_gives_up_after_attempts() {
        let stub = Arc::new(StubExchange::new().with_transient_failures(5));
        let adapter = adapter(Arc::clone(&stub), 1_000);
        let ctx = ctx();
        let err = adapter
            .read("get_price", || adapter.client.get_price(&ctx.network, "BTC"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Transport(_)));
        assert_eq!(stub.reads(), 3);
    }

    #[tokio::test]
    async fn test_rejections_are_not_retried() {
        let stub = Arc::new(StubExchange::new());
        let adapter = adapter(Arc::clone(&stub), 1_000);
        let ctx = ctx();
        let err = adapter
            .read("get_price", || adapter.client.get_price(&ctx.network, "NOPE"))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::Rejected("unknown symbol: NOPE".to_string()));
        assert_eq!(stub.reads(), 1);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let stub = Arc::new(StubExchange::new().with_delay(Duration::from_millis(200)));
        let adapter = adapter(Arc::clone(&stub), 20);
        let ctx = ctx();
        let err = adapter
            .bounded(adapter.client.get_price(&ctx.network, "BTC"))
            .await
            .unwrap_err();
        assert_eq!(err, ExchangeError::Timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_normalize_status_codes() {
        let adapter = adapter(Arc::new(StubExchange::new()), 1_000);
        let server = adapter.normalize(ClientError::Status {
            status: 503,
            body: "down".to_string(),
        });
        assert_eq!(server.kind(), crate::error::ErrorKind::TransportFailure);

        let client = adapter.normalize(ClientError::Status {
            status: 422,
            body: "bad".to_string(),
        });
        assert_eq!(client.kind(), crate::error::ErrorKind::ExchangeRejected);

        let limited = adapter.normalize(ClientError::RateLimited("slow".to_string()));
        assert_eq!(limited.kind(), crate::error::ErrorKind::ExchangeRejected);

        let decode = adapter.normalize(ClientError::Decode("garbage".to_string()));
        assert_eq!(decode.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn test_account_or_prefers_requested() {
        let default = Address::repeat_byte(0x11);
        let requested = Address::repeat_byte(0x22);
        let configured = ReadContext {
            account: Some(default),
            ..ctx()
        };
        assert_eq!(configured.account_or(Some(requested)).unwrap(), requested);
        assert_eq!(configured.account_or(None).unwrap(), default);
        assert!(ctx().account_or(None).is_err());
    }
}
