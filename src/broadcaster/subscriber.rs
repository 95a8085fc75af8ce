//! A single subscriber connection: its write half, rate limiter, and
//! liveness bookkeeping.

use crate::token_bucket::TokenBucket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::tcp::OwnedWriteHalf;

/// Opaque per-connection identity, assigned on accept.
pub type SubscriberId = u64;

/// Everything the Broadcaster needs to fan out to and evict one
/// subscriber.
pub(crate) struct SubscriberRecord {
  pub(crate) id: SubscriberId,
  pub(crate) writer: OwnedWriteHalf,
  pub(crate) bucket: TokenBucket,
  last_seen_ms: AtomicU64,
}

impl SubscriberRecord {
  pub(crate) fn new(id: SubscriberId, writer: OwnedWriteHalf, capacity: f64, refill_rate: f64) -> Self {
    SubscriberRecord {
      id,
      writer,
      bucket: TokenBucket::new(capacity, refill_rate),
      last_seen_ms: AtomicU64::new(now_ms()),
    }
  }

  pub(crate) fn touch(&self) {
    self.last_seen_ms.store(now_ms(), Ordering::Relaxed);
  }

  pub(crate) fn last_seen_ms(&self) -> u64 {
    self.last_seen_ms.load(Ordering::Relaxed)
  }

  /// Attempt a non-blocking write of the full `line`. Any partial write or
  /// error is treated as connection-fatal, matching the drop-on-error
  /// policy — this never retries.
  pub(crate) fn try_send_line(&self, line: &[u8]) -> std::io::Result<()> {
    match self.writer.try_write(line) {
      Ok(n) if n == line.len() => Ok(()),
      Ok(n) => Err(std::io::Error::new(
        std::io::ErrorKind::WriteZero,
        format!("partial send: wrote {n} of {} bytes", line.len()),
      )),
      Err(e) => Err(e),
    }
  }
}

fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}
