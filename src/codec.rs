//! Wire format: the 37-byte packed `Tick` and the 4-byte-length-prefixed
//! `Frame` it travels in.
//!
//! The packed layout is expressed as a `zerocopy`, `Unaligned` struct with
//! big-endian field wrappers — the same technique the crate's tick-parsing
//! heritage uses for zero-copy packet views (see the raw-frame helpers this
//! crate evolved from). `price` is carried as the big-endian bit pattern of
//! the `f64` and converted with `to_bits`/`from_bits`, which is exactly
//! "byte-reverse on a little-endian host, then reinterpret as IEEE-754."

use crate::errors::TickError;
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use zerocopy::big_endian::{U32 as BeU32, U64 as BeU64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Number of bytes a packed `Tick` occupies on the wire.
pub const PACKED_TICK_LEN: usize = 37;

/// Default cap on a single frame's payload length, per spec.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Frame type byte for a tick payload.
pub const FRAME_TYPE_TICK: u8 = 0x01;
/// Frame type byte for a subscriber handshake payload.
pub const FRAME_TYPE_HANDSHAKE: u8 = 0x10;

/// One market-data event.
///
/// `price` is only guaranteed `> 0` and finite *after* normalization; raw
/// ticks arriving from a feed may violate that and are filtered out by the
/// Normalizer (see `normalizer::engine`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
  pub timestamp_ms: u64,
  pub feed_id: u32,
  pub seq_id: u64,
  pub price: f64,
  pub size: u64,
  pub flags: u8,
}

/// On-wire layout of a packed `Tick`, byte-for-byte.
///
/// `price_bits` holds `f64::to_bits(price)`; never construct this type with
/// an arbitrary `u64` and hand the `f64` back out without going through
/// `from_bits`/`to_bits` — the bit pattern, not the numeric value, is what
/// crosses the wire.
#[repr(C)]
#[derive(Clone, Copy, Debug, Unaligned, KnownLayout, Immutable, FromBytes, IntoBytes)]
struct TickWire {
  timestamp_ms: BeU64,
  feed_id: BeU32,
  seq_id: BeU64,
  price_bits: BeU64,
  size: BeU64,
  flags: u8,
}

impl From<Tick> for TickWire {
  fn from(t: Tick) -> Self {
    TickWire {
      timestamp_ms: t.timestamp_ms.into(),
      feed_id: t.feed_id.into(),
      seq_id: t.seq_id.into(),
      price_bits: t.price.to_bits().into(),
      size: t.size.into(),
      flags: t.flags,
    }
  }
}

impl From<&TickWire> for Tick {
  fn from(w: &TickWire) -> Self {
    Tick {
      timestamp_ms: w.timestamp_ms.get(),
      feed_id: w.feed_id.get(),
      seq_id: w.seq_id.get(),
      price: f64::from_bits(w.price_bits.get()),
      size: w.size.get(),
      flags: w.flags,
    }
  }
}

/// Emit the exact 37-byte wire representation of `tick`.
pub fn pack_tick(tick: Tick) -> [u8; PACKED_TICK_LEN] {
  let wire = TickWire::from(tick);
  let mut out = [0u8; PACKED_TICK_LEN];
  out.copy_from_slice(wire.as_bytes());
  out
}

/// Parse a `Tick` from the first 37 bytes of `buf`.
///
/// Trailing bytes beyond the 37th are ignored; the framing layer is
/// responsible for sizing the slice it hands in.
pub fn unpack_tick(buf: &[u8]) -> Result<Tick, TickError> {
  if buf.len() < PACKED_TICK_LEN {
    return Err(TickError::ShortBuffer { got: buf.len() });
  }
  let wire = TickWire::ref_from_bytes(&buf[..PACKED_TICK_LEN])
    .expect("slice is exactly PACKED_TICK_LEN bytes and Unaligned");
  Ok(Tick::from(wire))
}

/// Frame a payload: 4-byte BE length (covering `type` + `payload`), then the
/// type byte, then the payload.
pub fn pack_frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
  let payload_len = payload.len() as u32 + 1;
  let mut out = Vec::with_capacity(4 + payload_len as usize);
  let mut len_be = [0u8; 4];
  BigEndian::write_u32(&mut len_be, payload_len);
  out.extend_from_slice(&len_be);
  out.push(frame_type);
  out.extend_from_slice(payload);
  out
}

/// Read one length-prefixed frame from `source`, returning `(type, payload)`.
///
/// Blocks (awaits) until the 4 length bytes and the declared payload have
/// both been read. Fails with `ShortRead` if the peer closes mid-frame, and
/// `Oversize` if the declared length exceeds `max_len`.
pub async fn read_frame<R>(
  source: &mut R,
  max_len: u32,
) -> Result<(u8, Vec<u8>), TickError>
where
  R: AsyncRead + Unpin,
{
  let mut len_buf = [0u8; 4];
  read_exact_or_short(source, &mut len_buf).await?;
  let len = BigEndian::read_u32(&len_buf);
  if len > max_len {
    return Err(TickError::Oversize { len, max: max_len });
  }
  if len == 0 {
    return Err(TickError::DecodeFailure { declared_type: 0, payload_len: 0 });
  }
  let mut body = vec![0u8; len as usize];
  read_exact_or_short(source, &mut body).await?;
  let frame_type = body[0];
  let payload = body.split_off(1);
  Ok((frame_type, payload))
}

async fn read_exact_or_short<R>(source: &mut R, buf: &mut [u8]) -> Result<(), TickError>
where
  R: AsyncRead + Unpin,
{
  let mut got = 0usize;
  while got < buf.len() {
    let n = match source.read(&mut buf[got..]).await {
      Ok(n) => n,
      Err(e) => {
        log::debug!("read_frame: read error after {got}/{} bytes: {e}", buf.len());
        return Err(TickError::ShortRead { want: buf.len(), got });
      }
    };
    if n == 0 {
      return Err(TickError::ShortRead { want: buf.len(), got });
    }
    got += n;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_tick() -> Tick {
    Tick {
      timestamp_ms: 1_630_000_000_000,
      feed_id: 5,
      seq_id: 42,
      price: 123.456,
      size: 1000,
      flags: 0,
    }
  }

  #[test]
  fn round_trips_bit_exact() {
    let t = sample_tick();
    let packed = pack_tick(t);
    let unpacked = unpack_tick(&packed).unwrap();
    assert_eq!(unpacked.timestamp_ms, t.timestamp_ms);
    assert_eq!(unpacked.feed_id, t.feed_id);
    assert_eq!(unpacked.seq_id, t.seq_id);
    assert_eq!(unpacked.price.to_bits(), t.price.to_bits());
    assert_eq!(unpacked.size, t.size);
    assert_eq!(unpacked.flags, t.flags);
  }

  #[test]
  fn unpack_rejects_short_buffer() {
    let buf = [0u8; 10];
    assert!(matches!(
      unpack_tick(&buf),
      Err(TickError::ShortBuffer { got: 10 })
    ));
  }

  #[test]
  fn unpack_ignores_trailing_bytes() {
    let t = sample_tick();
    let mut packed = pack_tick(t).to_vec();
    packed.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
    let unpacked = unpack_tick(&packed).unwrap();
    assert_eq!(unpacked, t);
  }

  #[test]
  fn frame_s5_matches_spec_example() {
    let t = Tick {
      timestamp_ms: 1_630_000_000_000,
      feed_id: 5,
      seq_id: 42,
      price: 123.456,
      size: 1000,
      flags: 0,
    };
    let payload = pack_tick(t);
    let frame = pack_frame(FRAME_TYPE_TICK, &payload);
    assert_eq!(frame.len(), 42);
    assert_eq!(&frame[0..4], &[0x00, 0x00, 0x00, 0x26]);
    assert_eq!(frame[4], 0x01);
  }

  #[tokio::test]
  async fn read_frame_round_trips() {
    let payload = b"hello".to_vec();
    let frame = pack_frame(FRAME_TYPE_HANDSHAKE, &payload);
    let mut cursor = std::io::Cursor::new(frame);
    let (ty, got_payload) =
      read_frame(&mut cursor, DEFAULT_MAX_FRAME_LEN).await.unwrap();
    assert_eq!(ty, FRAME_TYPE_HANDSHAKE);
    assert_eq!(got_payload, payload);
  }

  #[tokio::test]
  async fn read_frame_rejects_oversize() {
    let mut len_be = [0u8; 4];
    BigEndian::write_u32(&mut len_be, DEFAULT_MAX_FRAME_LEN + 1);
    let mut cursor = std::io::Cursor::new(len_be.to_vec());
    let err = read_frame(&mut cursor, DEFAULT_MAX_FRAME_LEN)
      .await
      .unwrap_err();
    assert!(matches!(err, TickError::Oversize { .. }));
  }

  #[tokio::test]
  async fn read_frame_rejects_short_read() {
    // Declares a 10-byte payload but supplies only 3.
    let mut buf = vec![];
    let mut len_be = [0u8; 4];
    BigEndian::write_u32(&mut len_be, 10);
    buf.extend_from_slice(&len_be);
    buf.extend_from_slice(&[1, 2, 3]);
    let mut cursor = std::io::Cursor::new(buf);
    let err = read_frame(&mut cursor, DEFAULT_MAX_FRAME_LEN)
      .await
      .unwrap_err();
    assert!(matches!(err, TickError::ShortRead { .. }));
  }
}
