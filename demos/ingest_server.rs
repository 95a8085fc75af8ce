//! Wires the core pipeline together: a feed-ingest listener feeds the
//! Normalizer, which emits to both the Broadcaster and a CSV persistence
//! sink. A minimal admin HTTP endpoint reports feed/subscriber counts.
//!
//! Out-of-scope collaborators (admin HTTP, persistence) get the smallest
//! implementation that satisfies their fixed interface; the core
//! components (`Normalizer`, `Broadcaster`) do all the real work.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tick_relay::codec::{read_frame, unpack_tick, FRAME_TYPE_TICK};
use tick_relay::{
  Broadcaster, BroadcasterConfig, CsvPersistence, Normalizer, NormalizerConfig, OutputSink, TickError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const FEED_PORT: u16 = 9000;
const ADMIN_PORT: u16 = 9200;
const ACCEPT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);

struct FanOutSink {
  broadcaster: Arc<Broadcaster>,
  persistence: Arc<CsvPersistence>,
}

impl OutputSink for FanOutSink {
  fn emit(&self, tick: tick_relay::Tick) {
    self.broadcaster.emit(tick);
    self.persistence.emit(tick);
  }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
  env_logger::init();

  let persistence = match CsvPersistence::open("normalized_log.csv") {
    Ok(p) => Arc::new(p),
    Err(e) => {
      log::error!("failed to open persistence log: {e}");
      return std::process::ExitCode::from(1);
    }
  };

  let broadcaster = Arc::new(Broadcaster::new(BroadcasterConfig::default()));
  broadcaster.start();

  let normalizer = Normalizer::new(NormalizerConfig { smoothing_window: 5, ..Default::default() });
  normalizer.set_sink(Arc::new(FanOutSink { broadcaster: broadcaster.clone(), persistence }));
  normalizer.start();

  let feed_count = Arc::new(AtomicUsize::new(0));

  tokio::spawn(run_admin_http(ADMIN_PORT, broadcaster.clone(), feed_count.clone()));

  let listener = match TcpListener::bind(("0.0.0.0", FEED_PORT)).await {
    Ok(l) => l,
    Err(e) => {
      log::error!("feed listener bind failed: {e}");
      return std::process::ExitCode::from(2);
    }
  };
  log::info!("feed ingest listening on port {FEED_PORT}");

  loop {
    match listener.accept().await {
      Ok((stream, addr)) => {
        feed_count.fetch_add(1, Ordering::SeqCst);
        log::info!("feed connected from {addr}");
        let normalizer = normalizer.clone();
        let feed_count = feed_count.clone();
        tokio::spawn(async move {
          handle_feed(stream, normalizer).await;
          feed_count.fetch_sub(1, Ordering::SeqCst);
          log::info!("feed {addr} disconnected");
        });
      }
      Err(e) => {
        log::warn!("feed accept error: {e}");
        tokio::time::sleep(ACCEPT_BACKOFF).await;
      }
    }
  }
}

async fn handle_feed(mut stream: tokio::net::TcpStream, normalizer: Normalizer) {
  loop {
    match read_frame(&mut stream, tick_relay::codec::DEFAULT_MAX_FRAME_LEN).await {
      Ok((frame_type, payload)) if frame_type == FRAME_TYPE_TICK => match unpack_tick(&payload) {
        Ok(tick) => normalizer.push_raw(tick),
        Err(e) => log::warn!("feed: decode failure: {e}"),
      },
      Ok((other, payload)) => {
        let err = TickError::DecodeFailure { declared_type: other, payload_len: payload.len() };
        log::warn!("feed: {err}");
      }
      Err(e) => {
        log::debug!("feed reader exiting: {e}");
        break;
      }
    }
  }
}

async fn run_admin_http(port: u16, broadcaster: Arc<Broadcaster>, feed_count: Arc<AtomicUsize>) {
  let addr: SocketAddr = ([0, 0, 0, 0], port).into();
  let listener = match TcpListener::bind(addr).await {
    Ok(l) => l,
    Err(e) => {
      log::warn!("admin http bind failed: {e}");
      return;
    }
  };
  log::info!("admin http running on port {port}");
  loop {
    let (mut stream, _) = match listener.accept().await {
      Ok(pair) => pair,
      Err(e) => {
        log::warn!("admin http accept error: {e}");
        tokio::time::sleep(ACCEPT_BACKOFF).await;
        continue;
      }
    };
    let feeds = feed_count.load(Ordering::SeqCst);
    let subscribers = broadcaster.subscriber_count().await;
    let body = format!("{{\"feeds\":{feeds},\"subscribers\":{subscribers}}}");
    let response = format!(
      "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      body.len(),
      body
    );
    // Drain and discard the request line; this endpoint answers GET any path identically.
    let mut discard = [0u8; 512];
    let _ = stream.read(&mut discard).await;
    let _ = stream.write_all(response.as_bytes()).await;
  }
}
