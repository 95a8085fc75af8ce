//! In-memory state exclusively owned by the Normalizer: the per-feed
//! reorder buffers and the bounded price history used for smoothing.

use crate::codec::Tick;
use std::collections::{HashMap, VecDeque};

/// Ordered ticks awaiting the reorder window for one feed.
#[derive(Debug, Default)]
pub struct PerFeedBuffer {
  pub ticks: VecDeque<Tick>,
}

/// Bounded history of recent prices for one feed, used for smoothing.
#[derive(Debug, Default)]
pub struct PriceHistory {
  pub prices: VecDeque<f64>,
}

impl PriceHistory {
  /// Append `price`, trim to at most `window` entries, and return the mean
  /// of what remains.
  pub fn push_and_mean(&mut self, price: f64, window: usize) -> f64 {
    self.prices.push_back(price);
    while self.prices.len() > window {
      self.prices.pop_front();
    }
    let sum: f64 = self.prices.iter().sum();
    sum / self.prices.len() as f64
  }
}

/// All state guarded by the Normalizer's single mutex.
#[derive(Debug, Default)]
pub struct NormalizerState {
  pub buffers: HashMap<u32, PerFeedBuffer>,
  pub history: HashMap<u32, PriceHistory>,
}

impl NormalizerState {
  pub fn push_raw(&mut self, tick: Tick) {
    self.buffers.entry(tick.feed_id).or_default().ticks.push_back(tick);
  }

  pub fn is_empty(&self) -> bool {
    self.buffers.values().all(|b| b.ticks.is_empty())
  }

  /// Pop every tick in every feed buffer whose window has elapsed as of
  /// `now_ms`, deleting emptied buffer entries. Returns the combined batch,
  /// unsorted.
  pub fn drain_ready(&mut self, now_ms: u64, window_ms: u64) -> Vec<Tick> {
    let mut ready = Vec::new();
    self.buffers.retain(|_feed_id, buf| {
      while let Some(front) = buf.ticks.front() {
        if front.timestamp_ms + window_ms <= now_ms {
          ready.push(buf.ticks.pop_front().unwrap());
        } else {
          break;
        }
      }
      !buf.ticks.is_empty()
    });
    ready
  }
}
