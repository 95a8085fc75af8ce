//! Concurrent fan-out with per-subscriber token-bucket rate limiting.

use super::config::BroadcasterConfig;
use super::listener::run_accept_loop;
use super::subscriber::{SubscriberId, SubscriberRecord};
use crate::codec::Tick;
use crate::errors::TickError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

#[derive(Serialize)]
struct DeltaMessage<'a> {
  #[serde(rename = "type")]
  kind: &'static str,
  tick: &'a TickJson,
}

#[derive(Serialize)]
struct TickJson {
  timestamp_ms: u64,
  feed_id: u32,
  seq_id: u64,
  price: f64,
  size: u64,
  flags: u8,
}

impl From<Tick> for TickJson {
  fn from(t: Tick) -> Self {
    TickJson {
      timestamp_ms: t.timestamp_ms,
      feed_id: t.feed_id,
      seq_id: t.seq_id,
      price: t.price,
      size: t.size,
      flags: t.flags,
    }
  }
}

/// Liveness/occupancy snapshot, exposed for the admin interface and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcasterHealth {
  pub subscriber_count: usize,
}

/// Accepts subscriber connections and forwards normalized ticks to each,
/// subject to its own token bucket. Implements [`OutputSink`] so it can be
/// handed directly to a [`Normalizer`](crate::normalizer::Normalizer).
pub struct Broadcaster {
  config: BroadcasterConfig,
  subscribers: Arc<Mutex<HashMap<SubscriberId, SubscriberRecord>>>,
  next_id: Arc<AtomicU64>,
  running: Arc<AtomicBool>,
  listener_handle: Arc<std::sync::Mutex<Option<JoinHandle<std::io::Result<()>>>>>,
  emit_tx: Arc<std::sync::Mutex<Option<mpsc::UnboundedSender<Tick>>>>,
  emit_handle: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl Broadcaster {
  pub fn new(config: BroadcasterConfig) -> Self {
    Broadcaster {
      config,
      subscribers: Arc::new(Mutex::new(HashMap::new())),
      next_id: Arc::new(AtomicU64::new(1)),
      running: Arc::new(AtomicBool::new(false)),
      listener_handle: Arc::new(std::sync::Mutex::new(None)),
      emit_tx: Arc::new(std::sync::Mutex::new(None)),
      emit_handle: Arc::new(std::sync::Mutex::new(None)),
    }
  }

  /// Bind the subscriber port, begin accepting connections, and start the
  /// ordered fan-out worker that [`emit`](Self::emit) feeds.
  pub fn start(&self) {
    if self.running.swap(true, Ordering::SeqCst) {
      return;
    }
    let config = self.config.clone();
    let subscribers = self.subscribers.clone();
    let next_id = self.next_id.clone();
    let running = self.running.clone();
    let join = tokio::spawn(run_accept_loop(config, subscribers, next_id, running));
    *self.listener_handle.lock().expect("listener handle lock poisoned") = Some(join);

    let (tx, mut rx) = mpsc::unbounded_channel::<Tick>();
    let subscribers = self.subscribers.clone();
    let emit_join = tokio::spawn(async move {
      while let Some(tick) = rx.recv().await {
        fan_out(&subscribers, tick).await;
      }
    });
    *self.emit_tx.lock().expect("emit tx lock poisoned") = Some(tx);
    *self.emit_handle.lock().expect("emit handle lock poisoned") = Some(emit_join);
  }

  /// Fan out one normalized tick to every current subscriber.
  ///
  /// Serializes the tick once, then holds the subscriber-table lock across
  /// the entire iteration: every `try_consume` gate and every non-blocking
  /// send happens under one lock acquisition, so a slow or malicious
  /// subscriber cannot be starved by concurrent table mutation mid-pass.
  pub async fn push_normalized(&self, tick: Tick) {
    fan_out(&self.subscribers, tick).await;
  }

  /// Number of currently-open subscriber connections.
  pub async fn subscriber_count(&self) -> usize {
    self.subscribers.lock().await.len()
  }

  /// Liveness snapshot for the admin interface.
  pub async fn health(&self) -> BroadcasterHealth {
    BroadcasterHealth { subscriber_count: self.subscriber_count().await }
  }

  /// Stop accepting new connections and close every current subscriber.
  /// Idempotent.
  pub async fn stop(&self) {
    if !self.running.swap(false, Ordering::SeqCst) {
      return;
    }
    if let Some(handle) = self.listener_handle.lock().expect("listener handle lock poisoned").take() {
      handle.abort();
    }
    self.emit_tx.lock().expect("emit tx lock poisoned").take();
    if let Some(handle) = self.emit_handle.lock().expect("emit handle lock poisoned").take() {
      let _ = handle.await;
    }
    self.subscribers.lock().await.clear();
  }
}

/// Serialize `tick` once, then hold the subscriber-table lock across the
/// full iteration: every `try_consume` gate and every non-blocking send
/// happens under one lock acquisition, matching the fan-out algorithm's
/// "hold across sends" policy.
async fn fan_out(subscribers: &Mutex<HashMap<SubscriberId, SubscriberRecord>>, tick: Tick) {
  let message = DeltaMessage { kind: "delta", tick: &TickJson::from(tick) };
  let mut line = match serde_json::to_vec(&message) {
    Ok(bytes) => bytes,
    Err(e) => {
      log::error!("broadcaster: failed to serialize tick: {e}");
      return;
    }
  };
  line.push(b'\n');

  let mut subscribers = subscribers.lock().await;
  let mut dead = Vec::new();
  for (id, sub) in subscribers.iter() {
    if !sub.bucket.try_consume(1.0) {
      log::debug!("{}", TickError::BucketExhausted { subscriber: *id });
      continue;
    }
    if let Err(e) = sub.try_send_line(&line) {
      log::debug!("subscriber {id} evicted: {}", TickError::SendFailure(e));
      dead.push(*id);
    }
  }
  for id in dead {
    subscribers.remove(&id);
  }
}

impl std::fmt::Debug for Broadcaster {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Broadcaster")
      .field("config", &self.config)
      .field("running", &self.running.load(Ordering::Relaxed))
      .finish()
  }
}

impl crate::normalizer::OutputSink for Broadcaster {
  /// The Normalizer invokes `emit` synchronously outside its own lock.
  /// Handing the tick to the fan-out worker over an unbounded channel
  /// keeps this call non-blocking while preserving emission order — two
  /// ticks from the same drain pass reach subscribers in the order they
  /// were emitted, which a bare `tokio::spawn` per tick would not
  /// guarantee.
  fn emit(&self, tick: Tick) {
    match self.emit_tx.lock().expect("emit tx lock poisoned").as_ref() {
      Some(tx) => {
        if tx.send(tick).is_err() {
          log::warn!("broadcaster: fan-out worker gone, dropping tick");
        }
      }
      None => log::warn!("broadcaster: emit called before start(), dropping tick"),
    }
  }
}
