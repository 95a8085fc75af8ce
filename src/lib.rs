#![allow(clippy::cognitive_complexity, clippy::large_enum_variant)]
#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![doc(test(
  no_crate_inject,
  attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! # tick-relay
//!
//! Real-time market-data tick normalization and fan-out. Ingests raw tick
//! streams from multiple upstream feeds over TCP, corrects for
//! out-of-order arrival, duplication, and implausible values across a
//! bounded time window, optionally smooths prices, and fans the
//! normalized stream out to many subscriber clients subject to
//! per-subscriber rate limits.
//!
//! ## Components
//!
//! - [`Normalizer`] — windowed reorder/dedup/filter/smooth engine, keyed
//!   by feed.
//! - [`Broadcaster`] — concurrent fan-out with per-client token-bucket
//!   rate limiting and lifecycle management.
//! - [`TokenBucket`] — the rate-limiting primitive underpinning the
//!   Broadcaster.
//! - [`codec`] — the binary tick and frame wire format.
//! - [`CsvPersistence`] — an append-only durable log, one of the
//!   Normalizer's possible output sinks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tick_relay::{Broadcaster, BroadcasterConfig, Normalizer, NormalizerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!   let broadcaster = Arc::new(Broadcaster::new(BroadcasterConfig::default()));
//!   broadcaster.start();
//!
//!   let normalizer = Normalizer::new(NormalizerConfig::default());
//!   normalizer.set_sink(broadcaster.clone());
//!   normalizer.start();
//!
//!   // Feed readers call normalizer.push_raw(tick) as frames arrive;
//!   // the Normalizer emits into the Broadcaster on its own schedule.
//! }
//! ```
//!
//! ## Wire format
//!
//! A tick is packed into exactly 37 bytes (`timestamp_ms`, `feed_id`,
//! `seq_id`, `price`, `size`, `flags`, all big-endian) and carried inside
//! a 4-byte-length-prefixed frame. See [`codec`] for the exact layout and
//! [`codec::read_frame`] for the async reader.

pub mod broadcaster;
pub mod codec;
pub mod errors;
pub mod normalizer;
pub mod persistence;
pub mod token_bucket;

pub use broadcaster::{Broadcaster, BroadcasterConfig, BroadcasterConfigBuilder, BroadcasterHealth};
pub use codec::Tick;
pub use errors::TickError;
pub use normalizer::{Normalizer, NormalizerConfig, NormalizerConfigBuilder, OutputSink};
pub use persistence::CsvPersistence;
pub use token_bucket::TokenBucket;
