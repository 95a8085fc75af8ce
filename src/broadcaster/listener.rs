//! Subscriber accept loop: handshake-then-peer-close-detection per
//! connection.

use super::config::BroadcasterConfig;
use super::subscriber::{SubscriberId, SubscriberRecord};
use crate::codec::{read_frame, FRAME_TYPE_HANDSHAKE};
use crate::errors::TickError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

type SubscriberTable = Arc<Mutex<HashMap<SubscriberId, SubscriberRecord>>>;

const ACCEPT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);
const WELCOME_LINE: &[u8] = b"{\"type\":\"snapshot\",\"note\":\"welcome\"}\n";

/// Bind `config.port` and accept subscriber connections until `running`
/// goes false. A short backoff follows any `accept` error to avoid busy
/// looping on persistent failures.
pub(crate) async fn run_accept_loop(
  config: BroadcasterConfig,
  subscribers: SubscriberTable,
  next_id: Arc<AtomicU64>,
  running: Arc<AtomicBool>,
) -> std::io::Result<()> {
  let addr = format!("0.0.0.0:{}", config.port);
  let listener = TcpListener::bind(&addr).await?;
  log::info!("broadcaster listening on {addr}");

  while running.load(Ordering::SeqCst) {
    match listener.accept().await {
      Ok((stream, peer)) => {
        let id = next_id.fetch_add(1, Ordering::SeqCst);
        log::debug!("subscriber {id} accepted from {peer}");
        tokio::spawn(handle_connection(
          id,
          stream,
          config.clone(),
          subscribers.clone(),
        ));
      }
      Err(e) => {
        log::warn!("broadcaster accept error: {e}");
        tokio::time::sleep(ACCEPT_BACKOFF).await;
      }
    }
  }
  Ok(())
}

async fn handle_connection(
  id: SubscriberId,
  stream: tokio::net::TcpStream,
  config: BroadcasterConfig,
  subscribers: SubscriberTable,
) {
  let (mut read_half, write_half) = stream.into_split();

  match read_frame(&mut read_half, config.max_frame_len).await {
    Ok((frame_type, payload)) => {
      if frame_type != FRAME_TYPE_HANDSHAKE {
        let err = TickError::DecodeFailure {
          declared_type: frame_type,
          payload_len: payload.len(),
        };
        log::warn!("subscriber {id}: {err}, dropping");
        return;
      }
    }
    Err(e) => {
      log::warn!("subscriber {id} handshake failed: {e}");
      return;
    }
  }

  let record = SubscriberRecord::new(id, write_half, config.burst_size, config.rate_limit);
  if let Err(e) = record.try_send_line(WELCOME_LINE) {
    log::warn!("subscriber {id} welcome send failed: {}", TickError::SendFailure(e));
    return;
  }

  subscribers.lock().await.insert(id, record);
  log::debug!("subscriber {id} subscribed");

  // Sole job from here: detect peer-close. Inbound bytes are not
  // interpreted as further protocol frames.
  let mut scratch = [0u8; 256];
  loop {
    match read_half.read(&mut scratch).await {
      Ok(0) => {
        log::debug!("subscriber {id} closed connection");
        break;
      }
      Ok(_) => {
        if let Some(sub) = subscribers.lock().await.get(&id) {
          sub.touch();
        }
      }
      Err(e) => {
        log::debug!("subscriber {id} read error: {e}");
        break;
      }
    }
  }

  subscribers.lock().await.remove(&id);
}
