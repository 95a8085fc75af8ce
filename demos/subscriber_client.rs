//! Minimal subscriber CLI: handshakes with the Broadcaster and prints each
//! delta line as it arrives.

use tick_relay::codec::{pack_frame, FRAME_TYPE_HANDSHAKE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> std::process::ExitCode {
  env_logger::init();

  let host = std::env::var("TICK_RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
  let port: u16 = std::env::var("TICK_RELAY_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(9100);

  let mut stream = match TcpStream::connect((host.as_str(), port)).await {
    Ok(s) => s,
    Err(e) => {
      eprintln!("connect failed: {e}");
      return std::process::ExitCode::from(2);
    }
  };

  let subscribe = r#"{"client_id":"subscriber-client","mode":"delta"}"#;
  let frame = pack_frame(FRAME_TYPE_HANDSHAKE, subscribe.as_bytes());
  if stream.write_all(&frame).await.is_err() {
    eprintln!("handshake send failed");
    return std::process::ExitCode::from(1);
  }

  let mut buf = vec![0u8; 4096];
  loop {
    match stream.read(&mut buf).await {
      Ok(0) => break,
      Ok(n) => print!("{}", String::from_utf8_lossy(&buf[..n])),
      Err(e) => {
        eprintln!("read error: {e}");
        break;
      }
    }
  }

  std::process::ExitCode::SUCCESS
}
