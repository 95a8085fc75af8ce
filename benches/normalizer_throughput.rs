//! Benchmarks the Normalizer's drain-pass throughput for a single feed
//! under varying batch sizes and smoothing configuration.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_relay::normalizer::{Normalizer, NormalizerConfig, OutputSink};
use tick_relay::codec::Tick;

struct CountingSink {
  count: Arc<AtomicU64>,
}

impl OutputSink for CountingSink {
  fn emit(&self, _tick: Tick) {
    self.count.fetch_add(1, Ordering::Relaxed);
  }
}

fn bench_drain_pass(c: &mut Criterion) {
  let rt = tokio::runtime::Runtime::new().unwrap();
  let mut group = c.benchmark_group("normalizer/drain_pass");

  for batch_size in [100u64, 1_000, 10_000] {
    group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, &batch_size| {
      b.iter(|| {
        rt.block_on(async {
          let config = NormalizerConfig { window_ms: 0, smoothing_window: 5, drain_interval_ms: 5 };
          let normalizer = Normalizer::new(config);
          let count = Arc::new(AtomicU64::new(0));
          normalizer.set_sink(Arc::new(CountingSink { count: count.clone() }));
          normalizer.start();

          let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
          for i in 0..batch_size {
            normalizer.push_raw(Tick {
              timestamp_ms: now.saturating_sub(1000),
              feed_id: 1,
              seq_id: i,
              price: 100.0 + (i % 10) as f64,
              size: 1,
              flags: 0,
            });
          }

          while count.load(Ordering::Relaxed) < batch_size {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
          }
          normalizer.stop().await;
        });
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_drain_pass);
criterion_main!(benches);
