//! Token-bucket rate limiting for per-subscriber fan-out.
//!
//! One bucket per subscriber connection. Refill is computed lazily from
//! elapsed monotonic time at `try_consume` time rather than on a timer, so
//! idle buckets cost nothing.

use std::sync::Mutex;
use std::time::Instant;

/// A single rate limiter: `capacity` tokens max, refilling at `refill_rate`
/// tokens/second.
#[derive(Debug)]
pub struct TokenBucket {
  inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
  capacity: f64,
  refill_rate: f64,
  tokens: f64,
  last_refill: Instant,
}

impl TokenBucket {
  /// Create a bucket that starts full.
  pub fn new(capacity: f64, refill_rate: f64) -> Self {
    TokenBucket {
      inner: Mutex::new(Inner {
        capacity,
        refill_rate,
        tokens: capacity,
        last_refill: Instant::now(),
      }),
    }
  }

  /// Refill based on elapsed time, then attempt to take `n` tokens
  /// all-or-nothing. Returns `true` and deducts `n` tokens on success,
  /// `false` (no deduction) if insufficient tokens remain.
  pub fn try_consume(&self, n: f64) -> bool {
    let mut inner = self.inner.lock().expect("token bucket mutex poisoned");
    let now = Instant::now();
    let elapsed_ms = now
      .checked_duration_since(inner.last_refill)
      .map(|d| d.as_secs_f64() * 1000.0)
      .unwrap_or(0.0);
    inner.last_refill = now;
    let refill = inner.refill_rate * elapsed_ms / 1000.0;
    inner.tokens = (inner.tokens + refill).min(inner.capacity);
    if inner.tokens >= n {
      inner.tokens -= n;
      true
    } else {
      false
    }
  }

  /// Current token level, for diagnostics/tests. Triggers a refill as a
  /// side effect, same as `try_consume`.
  pub fn available(&self) -> f64 {
    let mut inner = self.inner.lock().expect("token bucket mutex poisoned");
    let now = Instant::now();
    let elapsed_ms = now
      .checked_duration_since(inner.last_refill)
      .map(|d| d.as_secs_f64() * 1000.0)
      .unwrap_or(0.0);
    inner.last_refill = now;
    let refill = inner.refill_rate * elapsed_ms / 1000.0;
    inner.tokens = (inner.tokens + refill).min(inner.capacity);
    inner.tokens
  }
}
