//! Concurrent fan-out to subscriber clients with per-client token-bucket
//! rate limiting and lifecycle management.

mod config;
mod engine;
mod listener;
mod subscriber;

pub use config::{BroadcasterConfig, BroadcasterConfigBuilder};
pub use engine::{Broadcaster, BroadcasterHealth};
pub use subscriber::SubscriberId;
