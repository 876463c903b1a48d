use crate::metrics::Metrics;
use crate::store::{hash_key, ShardedStore};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::trace;

/// Picks which shards a sweep pass visits: a coin flip per shard, drawn
/// from a golden-ratio Weyl walk over a 64-bit state. The sweeper thread
/// owns the state exclusively, so plain mutation suffices.
struct ShardSampler {
  state: u64,
}

impl ShardSampler {
  fn new(seed: u64) -> Self {
    // An even seed would still work; forcing the low bit set just keeps
    // distinct caches from starting on identical walks.
    Self { state: seed | 1 }
  }

  /// True for roughly half the shards each pass.
  fn visit(&mut self) -> bool {
    self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    self.state >> 63 == 0
  }
}

/// The thread-safe parts of the cache the sweeper works with.
pub(crate) struct SweeperContext<V: Send + Sync> {
  pub(crate) store: Arc<ShardedStore<V>>,
  pub(crate) metrics: Arc<Metrics>,
}

/// The background task that keeps expired entries from lingering in shards
/// nobody reads anymore.
///
/// On every tick it walks the shards and runs a single-entry eviction on
/// each one it samples, backing off entirely while any public operation is
/// in flight. Strictly best effort: correctness never depends on it.
pub(crate) struct Sweeper {
  handle: JoinHandle<()>,
  stop_flag: Arc<AtomicBool>,
}

impl Sweeper {
  pub(crate) fn spawn<V>(context: SweeperContext<V>, tick_interval: Duration) -> Self
  where
    V: Send + Sync + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop = stop_flag.clone();

    // The store's hasher is seeded per cache instance, which makes it a
    // convenient seed source for the sampling walk.
    let seed = hash_key(&context.store.hasher, "sweeper");

    let handle = thread::spawn(move || {
      let mut sampler = ShardSampler::new(seed);
      while !stop.load(Ordering::Relaxed) {
        let tick_started = Instant::now();
        Self::sweep(&context, &mut sampler);
        if let Some(remaining) = tick_interval.checked_sub(tick_started.elapsed()) {
          thread::sleep(remaining);
        }
      }
    });

    Self { handle, stop_flag }
  }

  /// One pass over the shards: skip while traffic is active, visit half
  /// the shards, and reclaim at most one entry from each visited shard.
  fn sweep<V: Send + Sync>(context: &SweeperContext<V>, sampler: &mut ShardSampler) {
    for (i, shard) in context.store.shards.iter().enumerate() {
      if context.store.ops_in_flight() != 0 {
        continue;
      }
      if !sampler.visit() {
        continue;
      }

      let swept = shard.policy.lock().evict(1);
      if swept > 0 {
        context
          .metrics
          .swept
          .fetch_add(swept as u64, Ordering::Relaxed);
        trace!(shard = i, swept, "sweeper reclaimed entries");
      }
    }
  }

  /// Signals the sweeper to exit; the thread finishes its current tick on
  /// its own time rather than blocking the caller.
  pub(crate) fn stop(self) {
    self.stop_flag.store(true, Ordering::Relaxed);
    drop(self.handle);
  }
}
