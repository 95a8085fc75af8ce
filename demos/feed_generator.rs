//! Synthetic load generator: connects as one upstream feed and streams
//! ticks with randomized jitter and occasional duplicate sends, mirroring
//! the behavior a real feed's retransmission and network jitter produce.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use tick_relay::codec::{pack_frame, pack_tick, FRAME_TYPE_TICK};
use tick_relay::Tick;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const TICK_COUNT: usize = 5000;

#[tokio::main]
async fn main() -> std::process::ExitCode {
  env_logger::init();

  let feed_id: u32 = std::env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(1);
  let host = std::env::var("TICK_RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
  let port: u16 = std::env::var("TICK_RELAY_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(9000);

  let mut stream = match TcpStream::connect((host.as_str(), port)).await {
    Ok(s) => s,
    Err(e) => {
      log::error!("connect failed: {e}");
      return std::process::ExitCode::from(2);
    }
  };

  let mut rng = rand::thread_rng();
  let base = 100.0 + feed_id as f64;
  let mut seq: u64 = 1;

  for i in 0..TICK_COUNT {
    let tick = Tick {
      timestamp_ms: now_ms(),
      feed_id,
      seq_id: seq,
      price: base + (i % 20) as f64 * 0.01,
      size: 100,
      flags: 0,
    };
    seq += 1;

    let frame = pack_frame(FRAME_TYPE_TICK, &pack_tick(tick));

    let jitter_ms: u64 = rng.gen_range(0..40);
    tokio::time::sleep(std::time::Duration::from_millis(10 + jitter_ms)).await;

    if stream.write_all(&frame).await.is_err() {
      log::warn!("feed {feed_id}: send failed, stopping");
      break;
    }
    if i % 50 == 0 {
      let _ = stream.write_all(&frame).await;
    }
  }

  std::process::ExitCode::SUCCESS
}

fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}
