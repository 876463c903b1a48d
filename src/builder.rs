use crate::clock::{Clock, SystemClock};
use crate::error::BoxError;
use crate::handle::Cache;
use crate::loader::{LoaderFn, MultiLoaderFn};
use crate::metrics::Metrics;
use crate::options::Options;
use crate::policy::{new_policy, PolicyKind};
use crate::remote::RemoteCache;
use crate::shared::{CacheShared, Defaults};
use crate::store::{Shard, ShardedStore};
use crate::task::sweeper::{Sweeper, SweeperContext};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Capacity assumed when the caller passes zero.
const DEFAULT_CACHE_SIZE: usize = 2560;
/// Entries one shard aims to hold; drives the default shard count.
const DEFAULT_SHARD_CAP: usize = 256;
/// Lower bound on the number of shards.
const DEFAULT_SHARD_COUNT: usize = 32;
/// How long a served default value stays cached unless overridden.
const DEFAULT_VALUE_TTL: Duration = Duration::from_secs(60);
/// How often the background sweeper wakes up.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Configures and builds a [`Cache`].
pub struct CacheBuilder<V> {
  total_entries: usize,
  policy: PolicyKind,
  shards: Option<usize>,
  clock: Option<Arc<dyn Clock>>,
  ttl: Duration,
  loader: Option<LoaderFn<V>>,
  multi_loader: Option<MultiLoaderFn<V>>,
  default_value: Option<Arc<V>>,
  default_value_ttl: Duration,
  remote: Option<Arc<dyn RemoteCache>>,
  options_template: Options<V>,
  sweep_interval: Duration,
}

impl<V: Send + Sync + 'static> CacheBuilder<V> {
  /// Starts a builder for a cache holding up to `total_entries` entries
  /// under the given eviction policy. Zero selects the default capacity.
  pub fn new(total_entries: usize, policy: PolicyKind) -> Self {
    Self {
      total_entries,
      policy,
      shards: None,
      clock: None,
      ttl: Duration::ZERO,
      loader: None,
      multi_loader: None,
      default_value: None,
      default_value_ttl: DEFAULT_VALUE_TTL,
      remote: None,
      options_template: Options::new(),
      sweep_interval: SWEEP_INTERVAL,
    }
  }

  /// Overrides the shard count. Rounded up to a power of two so shard
  /// selection stays a mask over the key hash.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = Some(shards.max(1).next_power_of_two());
    self
  }

  /// Substitutes the time source. Tests use this to drive expiration with a
  /// manual clock.
  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  /// Default per-set expiration. Zero (the default) means no expiration.
  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// The single-key miss filler, consulted when a lookup misses locally.
  pub fn loader(
    mut self,
    f: impl Fn(&str) -> Result<V, BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.loader = Some(Arc::new(f));
    self
  }

  /// The batch miss filler, consulted by `mget` for keys that miss locally.
  pub fn multi_loader(
    mut self,
    f: impl Fn(&[String]) -> Result<HashMap<String, V>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.multi_loader = Some(Arc::new(f));
    self
  }

  /// The value served (and briefly cached) when the loader fails.
  pub fn default_value(mut self, value: V) -> Self {
    self.default_value = Some(Arc::new(value));
    self
  }

  /// How long a served default value stays cached. 60 seconds by default.
  pub fn default_value_ttl(mut self, ttl: Duration) -> Self {
    self.default_value_ttl = ttl;
    self
  }

  /// Attaches a remote second-level cache. Writes go remote-first; local
  /// misses consult it before the loader.
  pub fn remote(mut self, remote: Arc<dyn RemoteCache>) -> Self {
    self.remote = Some(remote);
    self
  }

  /// The byte codec for remote payloads. Required whenever a remote tier is
  /// configured.
  pub fn codec(
    mut self,
    encode: impl Fn(&V) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    decode: impl Fn(&[u8]) -> Result<V, BoxError> + Send + Sync + 'static,
  ) -> Self {
    self.options_template = self.options_template.codec(encode, decode);
    self
  }

  /// Overrides how often the background sweeper wakes up.
  /// (Primarily for tests.)
  #[doc(hidden)]
  pub fn sweep_interval(mut self, interval: Duration) -> Self {
    self.sweep_interval = interval;
    self
  }

  /// Builds the cache: sizes the shard set, instantiates one policy per
  /// shard, and starts the background sweeper.
  pub fn build(self) -> Cache<V> {
    let size = if self.total_entries == 0 {
      DEFAULT_CACHE_SIZE
    } else {
      self.total_entries
    };
    let (shard_count, shard_cap) = shard_layout(size, self.shards);

    let clock = self
      .clock
      .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

    let shards: Vec<Shard<V>> = (0..shard_count)
      .map(|_| Shard {
        policy: Mutex::new(new_policy(self.policy, clock.clone(), shard_cap)),
      })
      .collect();
    let store = Arc::new(ShardedStore::new(shards));
    let metrics = Arc::new(Metrics::new());

    let sweeper = Sweeper::spawn(
      SweeperContext {
        store: store.clone(),
        metrics: metrics.clone(),
      },
      self.sweep_interval,
    );

    Cache {
      shared: Arc::new(CacheShared {
        store,
        metrics,
        defaults: Defaults {
          ttl: self.ttl,
          loader: self.loader,
          multi_loader: self.multi_loader,
          default_value: self.default_value,
          default_value_ttl: self.default_value_ttl,
          remote: self.remote,
          encode: self.options_template.encode,
          decode: self.options_template.decode,
        },
        sweeper: Some(sweeper),
      }),
    }
  }
}

/// Shard count and per-shard capacity for a cache of `size` entries.
///
/// Without an explicit shard count, one shard is derived per 256 entries
/// (at least 32 shards, rounded up to a power of two) and every shard holds
/// at least 256 entries. An explicit count keeps the plain
/// `max(1, size / count)` split so small test caches stay exact.
fn shard_layout(size: usize, shards: Option<usize>) -> (usize, usize) {
  match shards {
    Some(count) => (count, (size / count).max(1)),
    None => {
      let count = ((size + DEFAULT_SHARD_CAP - 1) / DEFAULT_SHARD_CAP)
        .max(DEFAULT_SHARD_COUNT)
        .next_power_of_two();
      (count, (size / count).max(DEFAULT_SHARD_CAP))
    }
  }
}
