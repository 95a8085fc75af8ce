//! Tunables for the Normalizer, with a fluent builder mirroring
//! `kiteticker-async-manager`'s config style.

/// Configuration for a [`Normalizer`](super::engine::Normalizer) instance.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
  /// Minimum age (ms) a tick must reach, relative to its own `timestamp_ms`,
  /// before it becomes eligible for emission.
  pub window_ms: u64,
  /// Number of most-recent prices per feed averaged on emission. `0`
  /// disables smoothing.
  pub smoothing_window: usize,
  /// Sleep between drain passes.
  pub drain_interval_ms: u64,
}

impl Default for NormalizerConfig {
  fn default() -> Self {
    NormalizerConfig {
      window_ms: 200,
      smoothing_window: 0,
      drain_interval_ms: 10,
    }
  }
}

/// Fluent builder for [`NormalizerConfig`].
#[derive(Debug, Default, Clone)]
pub struct NormalizerConfigBuilder {
  config: NormalizerConfig,
}

impl NormalizerConfigBuilder {
  pub fn new() -> Self {
    NormalizerConfigBuilder::default()
  }

  pub fn window_ms(mut self, window_ms: u64) -> Self {
    self.config.window_ms = window_ms;
    self
  }

  pub fn smoothing_window(mut self, smoothing_window: usize) -> Self {
    self.config.smoothing_window = smoothing_window;
    self
  }

  pub fn drain_interval_ms(mut self, drain_interval_ms: u64) -> Self {
    self.config.drain_interval_ms = drain_interval_ms;
    self
  }

  pub fn build(self) -> NormalizerConfig {
    self.config
  }
}
