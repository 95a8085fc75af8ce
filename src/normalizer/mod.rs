//! Windowed reorder/dedup/filter/smooth engine, keyed by feed.

mod config;
mod engine;
mod sink;
mod state;

pub use config::{NormalizerConfig, NormalizerConfigBuilder};
pub use engine::Normalizer;
pub use sink::OutputSink;
pub use state::{PerFeedBuffer, PriceHistory};
