use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Nonce source shared by every signed action of one client.
///
/// The exchange expects millisecond timestamps and rejects reuse, so
/// concurrent writes issued in the same millisecond get bumped forward:
/// each call returns `max(now_ms, previous + 1)`.
#[derive(Debug, Default)]
pub struct NonceSource {
    last: AtomicU64,
}

impl NonceSource {
    pub fn new() -> Self {
        NonceSource {
            last: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> u64 {
        self.next_at(Utc::now().timestamp_millis().max(0) as u64)
    }

    fn next_at(&self, now_ms: u64) -> u64 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}
