//! Tunables for the Broadcaster, with a fluent builder mirroring
//! `kiteticker-async-manager`'s config style.

/// Configuration for a [`Broadcaster`](super::engine::Broadcaster) instance.
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
  /// TCP port the subscriber listener binds.
  pub port: u16,
  /// Per-subscriber refill rate, ticks/second.
  pub rate_limit: f64,
  /// Per-subscriber token bucket capacity.
  pub burst_size: f64,
  /// Maximum accepted frame length (handshake payload).
  pub max_frame_len: u32,
}

impl Default for BroadcasterConfig {
  fn default() -> Self {
    BroadcasterConfig {
      port: 9100,
      rate_limit: 100.0,
      burst_size: 100.0,
      max_frame_len: crate::codec::DEFAULT_MAX_FRAME_LEN,
    }
  }
}

/// Fluent builder for [`BroadcasterConfig`].
#[derive(Debug, Default, Clone)]
pub struct BroadcasterConfigBuilder {
  config: BroadcasterConfig,
}

impl BroadcasterConfigBuilder {
  pub fn new() -> Self {
    BroadcasterConfigBuilder::default()
  }

  pub fn port(mut self, port: u16) -> Self {
    self.config.port = port;
    self
  }

  pub fn rate_limit(mut self, rate_limit: f64) -> Self {
    self.config.rate_limit = rate_limit;
    self
  }

  pub fn burst_size(mut self, burst_size: f64) -> Self {
    self.config.burst_size = burst_size;
    self
  }

  pub fn max_frame_len(mut self, max_frame_len: u32) -> Self {
    self.config.max_frame_len = max_frame_len;
    self
  }

  pub fn build(self) -> BroadcasterConfig {
    self.config
  }
}
