//! The Normalizer's single polymorphic output boundary.

use crate::codec::Tick;

/// A capability object the Normalizer invokes once per emitted tick.
///
/// Implementors must not block for long (the drain pass is synchronous
/// with respect to the sink) and must never call back into the
/// Normalizer that holds them.
pub trait OutputSink: Send + Sync {
  fn emit(&self, tick: Tick);
}

impl<F> OutputSink for F
where
  F: Fn(Tick) + Send + Sync,
{
  fn emit(&self, tick: Tick) {
    self(tick)
  }
}
