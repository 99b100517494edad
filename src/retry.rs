use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Retry an async operation with exponential backoff while `should_retry`
/// accepts the error. `attempts` counts the first call.
pub async fn retry_if<F, Fut, T, E, P>(
    mut op: F,
    attempts: usize,
    initial_delay: Duration,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && should_retry(&e) => {
                debug!("attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
                sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
