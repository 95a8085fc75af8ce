//! End-to-end tests driving the Normalizer and Broadcaster together over
//! real TCP sockets, exercising the scenarios the wire protocol and
//! fan-out policy are expected to satisfy.

use std::sync::Arc;
use tick_relay::codec::{pack_frame, FRAME_TYPE_HANDSHAKE};
use tick_relay::{Broadcaster, BroadcasterConfigBuilder, Normalizer, NormalizerConfig, Tick};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn connect_and_handshake(port: u16) -> TcpStream {
  let mut stream = loop {
    match TcpStream::connect(("127.0.0.1", port)).await {
      Ok(s) => break s,
      Err(_) => tokio::time::sleep(std::time::Duration::from_millis(5)).await,
    }
  };
  let handshake = pack_frame(FRAME_TYPE_HANDSHAKE, br#"{"client_id":"it"}"#);
  stream.write_all(&handshake).await.unwrap();
  stream
}

#[tokio::test]
async fn normalizer_to_broadcaster_delivers_in_order() {
  let config = BroadcasterConfigBuilder::new().port(19_201).build();
  let broadcaster = Arc::new(Broadcaster::new(config.clone()));
  broadcaster.start();

  let normalizer = Normalizer::new(NormalizerConfig { window_ms: 50, smoothing_window: 0, drain_interval_ms: 5 });
  normalizer.set_sink(broadcaster.clone());
  normalizer.start();

  let mut subscriber = connect_and_handshake(config.port).await;
  let mut welcome = vec![0u8; 256];
  let n = subscriber.read(&mut welcome).await.unwrap();
  assert!(String::from_utf8_lossy(&welcome[..n]).contains("snapshot"));

  let past = now_ms().saturating_sub(1000);
  normalizer.push_raw(Tick { timestamp_ms: past, feed_id: 1, seq_id: 2, price: 10.0, size: 1, flags: 0 });
  normalizer.push_raw(Tick { timestamp_ms: past - 5, feed_id: 1, seq_id: 1, price: 9.0, size: 1, flags: 0 });

  let mut buf = vec![0u8; 4096];
  let n = subscriber.read(&mut buf).await.unwrap();
  let text = String::from_utf8_lossy(&buf[..n]).to_string();
  let first_seq1 = text.find("\"seq_id\":1").unwrap();
  let first_seq2 = text.find("\"seq_id\":2").unwrap();
  assert!(first_seq1 < first_seq2, "expected seq 1 before seq 2, got: {text}");

  normalizer.stop().await;
  broadcaster.stop().await;
}

#[tokio::test]
async fn subscriber_count_tracks_connects_and_disconnects() {
  let config = BroadcasterConfigBuilder::new().port(19_202).build();
  let broadcaster = Broadcaster::new(config.clone());
  broadcaster.start();

  assert_eq!(broadcaster.subscriber_count().await, 0);

  let stream = connect_and_handshake(config.port).await;
  tokio::time::sleep(std::time::Duration::from_millis(30)).await;
  assert_eq!(broadcaster.subscriber_count().await, 1);

  drop(stream);
  tokio::time::sleep(std::time::Duration::from_millis(50)).await;
  assert_eq!(broadcaster.subscriber_count().await, 0);

  broadcaster.stop().await;
}

fn now_ms() -> u64 {
  std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}
