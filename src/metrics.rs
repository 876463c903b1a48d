use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// Internal counters for the cache. All fields are atomic so updates stay
/// lock-free on the hot paths.
#[derive(Debug)]
pub(crate) struct Metrics {
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) invalidations: CachePadded<AtomicU64>,
  pub(crate) loads: CachePadded<AtomicU64>,
  pub(crate) load_failures: CachePadded<AtomicU64>,
  pub(crate) defaults_served: CachePadded<AtomicU64>,
  pub(crate) swept: CachePadded<AtomicU64>,
  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      invalidations: CachePadded::new(AtomicU64::new(0)),
      loads: CachePadded::new(AtomicU64::new(0)),
      load_failures: CachePadded::new(AtomicU64::new(0)),
      defaults_served: CachePadded::new(AtomicU64::new(0)),
      swept: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn incr(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
  }

  /// A point-in-time snapshot of the counters.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if lookups == 0 {
        0.0
      } else {
        hits as f64 / lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      loads: self.loads.load(Ordering::Relaxed),
      load_failures: self.load_failures.load(Ordering::Relaxed),
      defaults_served: self.defaults_served.load(Ordering::Relaxed),
      swept: self.swept.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A public, point-in-time view of the cache's counters.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups answered from a local shard.
  pub hits: u64,
  /// Lookups that missed locally (before any loader ran).
  pub misses: u64,
  /// hits / (hits + misses).
  pub hit_ratio: f64,
  /// Entries written through the public API or a loader.
  pub inserts: u64,
  /// Entries removed through `remove` / `mremove`.
  pub invalidations: u64,
  /// Values produced by the composed loader (remote tier or user loader).
  pub loads: u64,
  /// Loader invocations that failed outright.
  pub load_failures: u64,
  /// Times the configured default value stood in for a failed load.
  pub defaults_served: u64,
  /// Entries reclaimed by the background sweeper.
  pub swept: u64,
  /// Seconds since the cache was built.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("invalidations", &self.invalidations)
      .field("loads", &self.loads)
      .field("load_failures", &self.load_failures)
      .field("defaults_served", &self.defaults_served)
      .field("swept", &self.swept)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
