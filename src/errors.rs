use thiserror::Error;

/// Errors surfaced by the codec, the Normalizer, and the Broadcaster.
///
/// `BucketExhausted` and `SinkAbsent` are non-fatal by contract: callers
/// observing them drop the tick for the affected subscriber/sink and
/// continue — they never unwind a drain pass or a fan-out loop.
#[derive(Error, Debug)]
pub enum TickError {
  #[error("buffer shorter than a packed tick (need 37 bytes, got {got})")]
  ShortBuffer { got: usize },

  #[error("peer closed mid-frame (wanted {want} bytes, got {got})")]
  ShortRead { want: usize, got: usize },

  #[error("frame length {len} exceeds maximum {max}")]
  Oversize { len: u32, max: u32 },

  #[error(
    "frame payload length {payload_len} inconsistent with declared type {declared_type:#x}"
  )]
  DecodeFailure { declared_type: u8, payload_len: usize },

  #[error("send failed: {0}")]
  SendFailure(#[from] std::io::Error),

  #[error("token bucket exhausted for subscriber {subscriber}")]
  BucketExhausted { subscriber: u64 },

  #[error("no output sink configured")]
  SinkAbsent,
}
