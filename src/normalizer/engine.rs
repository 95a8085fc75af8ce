//! The windowed reorder/dedup/filter/smooth engine.

use super::config::NormalizerConfig;
use super::sink::OutputSink;
use super::state::NormalizerState;
use crate::codec::Tick;
use crate::errors::TickError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// Windowed reorder/dedup/filter/smooth engine, keyed by `feed_id`.
///
/// Cloning shares the same underlying state and worker — clones are cheap
/// handles, the same handle pattern `kiteticker-async-manager`'s manager
/// types use.
#[derive(Clone)]
pub struct Normalizer {
  state: Arc<Mutex<NormalizerState>>,
  sink: Arc<RwLock<Option<Arc<dyn OutputSink>>>>,
  running: Arc<AtomicBool>,
  config: NormalizerConfig,
  handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Normalizer {
  pub fn new(config: NormalizerConfig) -> Self {
    Normalizer {
      state: Arc::new(Mutex::new(NormalizerState::default())),
      sink: Arc::new(RwLock::new(None)),
      running: Arc::new(AtomicBool::new(false)),
      config,
      handle: Arc::new(Mutex::new(None)),
    }
  }

  /// Replace the output sink atomically. May be called before or after
  /// `start()`.
  pub fn set_sink(&self, sink: Arc<dyn OutputSink>) {
    *self.sink.write().expect("sink lock poisoned") = Some(sink);
  }

  /// Append a raw tick to its feed's buffer. Never blocks beyond a short
  /// critical section; safe to call from a feed reader's hot path.
  pub fn push_raw(&self, tick: Tick) {
    let mut state = self.state.lock().expect("normalizer state lock poisoned");
    state.push_raw(tick);
  }

  /// Spawn the background drain-pass worker. No-op if already running.
  pub fn start(&self) {
    if self.running.swap(true, Ordering::SeqCst) {
      return;
    }
    let state = self.state.clone();
    let sink = self.sink.clone();
    let running = self.running.clone();
    let config = self.config.clone();
    let join = tokio::spawn(async move {
      loop {
        drain_pass(&state, &sink, &config);
        if !running.load(Ordering::SeqCst) {
          let empty = state.lock().expect("normalizer state lock poisoned").is_empty();
          if empty {
            break;
          }
        }
        tokio::time::sleep(std::time::Duration::from_millis(config.drain_interval_ms)).await;
      }
    });
    *self.handle.lock().expect("handle lock poisoned") = Some(join);
  }

  /// Request shutdown and wait for the worker to drain remaining ticks
  /// that satisfy the window, then exit. Idempotent.
  pub async fn stop(&self) {
    self.running.store(false, Ordering::SeqCst);
    let join = self.handle.lock().expect("handle lock poisoned").take();
    if let Some(join) = join {
      let _ = join.await;
    }
  }
}

impl std::fmt::Debug for Normalizer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Normalizer")
      .field("config", &self.config)
      .field("running", &self.running.load(Ordering::Relaxed))
      .finish()
  }
}

fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

/// One drain pass: pop ready ticks under the lock, release it, then sort,
/// dedup, filter, smooth and emit.
fn drain_pass(
  state: &Arc<Mutex<NormalizerState>>,
  sink: &Arc<RwLock<Option<Arc<dyn OutputSink>>>>,
  config: &NormalizerConfig,
) {
  let now = now_ms();
  let mut ready = {
    let mut state = state.lock().expect("normalizer state lock poisoned");
    state.drain_ready(now, config.window_ms)
  };

  ready.sort_by(|a, b| (a.timestamp_ms, a.seq_id).cmp(&(b.timestamp_ms, b.seq_id)));

  let mut seen = HashSet::with_capacity(ready.len());
  let sink_guard = sink.read().expect("sink lock poisoned");

  for tick in ready {
    if !seen.insert((tick.feed_id, tick.seq_id)) {
      continue;
    }
    if tick.price <= 0.0 || !tick.price.is_finite() {
      continue;
    }

    let emitted = if config.smoothing_window > 0 {
      let mean = {
        let mut state = state.lock().expect("normalizer state lock poisoned");
        let history = state.history.entry(tick.feed_id).or_default();
        history.push_and_mean(tick.price, config.smoothing_window)
      };
      Tick { price: mean, ..tick }
    } else {
      tick
    };

    if let Some(sink) = sink_guard.as_ref() {
      sink.emit(emitted);
    } else {
      log::debug!("normalizer: {} (feed {}), dropping tick", TickError::SinkAbsent, emitted.feed_id);
    }
  }
}
