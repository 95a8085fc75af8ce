//! Property-based checks of the invariants the codec, Normalizer, and
//! TokenBucket are expected to hold over arbitrary inputs.

use proptest::prelude::*;
use tick_relay::codec::{pack_frame, pack_tick, read_frame, unpack_tick, Tick};
use tick_relay::TokenBucket;

fn arb_tick() -> impl Strategy<Value = Tick> {
  (
    any::<u64>(),
    any::<u32>(),
    any::<u64>(),
    any::<f64>(),
    any::<u64>(),
    any::<u8>(),
  )
    .prop_map(|(timestamp_ms, feed_id, seq_id, price, size, flags)| Tick {
      timestamp_ms,
      feed_id,
      seq_id,
      price,
      size,
      flags,
    })
}

proptest! {
  // Invariant 1: pack/unpack round-trips bit-exact for every field,
  // including the price's IEEE-754 bit pattern (so NaN payloads still
  // compare equal via to_bits).
  #[test]
  fn tick_round_trips_bit_exact(t in arb_tick()) {
    let packed = pack_tick(t);
    let unpacked = unpack_tick(&packed).unwrap();
    prop_assert_eq!(unpacked.timestamp_ms, t.timestamp_ms);
    prop_assert_eq!(unpacked.feed_id, t.feed_id);
    prop_assert_eq!(unpacked.seq_id, t.seq_id);
    prop_assert_eq!(unpacked.price.to_bits(), t.price.to_bits());
    prop_assert_eq!(unpacked.size, t.size);
    prop_assert_eq!(unpacked.flags, t.flags);
  }

  // Invariant 2: read_frame recovers exactly the (type, payload) pair a
  // frame was packed from, for payloads within the configured cap.
  #[test]
  fn frame_round_trips(frame_type in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
    let frame = pack_frame(frame_type, &payload);
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let (got_type, got_payload) = rt.block_on(async {
      let mut cursor = std::io::Cursor::new(frame);
      read_frame(&mut cursor, tick_relay::codec::DEFAULT_MAX_FRAME_LEN).await.unwrap()
    });
    prop_assert_eq!(got_type, frame_type);
    prop_assert_eq!(got_payload, payload);
  }

  // Invariant 5: over any duration, a bucket's successful try_consume(1)
  // count never exceeds capacity + ceil(refill_rate * elapsed_seconds).
  #[test]
  fn token_bucket_never_exceeds_refill_bound(
    capacity in 1.0f64..50.0,
    refill_rate in 0.0f64..2000.0,
    attempts in 1usize..200,
  ) {
    let bucket = TokenBucket::new(capacity, refill_rate);
    let start = std::time::Instant::now();
    let mut successes = 0u64;
    for _ in 0..attempts {
      if bucket.try_consume(1.0) {
        successes += 1;
      }
    }
    let elapsed_s = start.elapsed().as_secs_f64();
    let bound = capacity + (refill_rate * elapsed_s).ceil();
    prop_assert!((successes as f64) <= bound + 1.0);
  }
}
