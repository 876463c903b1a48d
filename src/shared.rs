use crate::loader::{LoaderFn, MultiLoaderFn};
use crate::metrics::Metrics;
use crate::options::{Options, Resolved};
use crate::remote::{DecodeFn, EncodeFn, RemoteCache, RemoteHandle};
use crate::store::ShardedStore;
use crate::task::sweeper::Sweeper;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Cache-level option defaults, set once at build time.
pub(crate) struct Defaults<V> {
  pub(crate) ttl: Duration,
  pub(crate) loader: Option<LoaderFn<V>>,
  pub(crate) multi_loader: Option<MultiLoaderFn<V>>,
  pub(crate) default_value: Option<Arc<V>>,
  pub(crate) default_value_ttl: Duration,
  pub(crate) remote: Option<Arc<dyn RemoteCache>>,
  pub(crate) encode: Option<EncodeFn<V>>,
  pub(crate) decode: Option<DecodeFn<V>>,
}

/// The shared core behind every `Cache` handle.
pub(crate) struct CacheShared<V: Send + Sync> {
  pub(crate) store: Arc<ShardedStore<V>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) defaults: Defaults<V>,
  pub(crate) sweeper: Option<Sweeper>,
}

impl<V: Send + Sync> fmt::Debug for CacheShared<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("shards", &self.store.shards.len())
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<V: Send + Sync> CacheShared<V> {
  /// Overlays one call's options onto the cache defaults.
  pub(crate) fn resolve(&self, opts: Options<V>) -> Resolved<V> {
    let d = &self.defaults;
    Resolved {
      ttl: opts.ttl.unwrap_or(d.ttl),
      loader: opts.loader.or_else(|| d.loader.clone()),
      multi_loader: opts.multi_loader.or_else(|| d.multi_loader.clone()),
      default_value: opts.default_value.or_else(|| d.default_value.clone()),
      default_value_ttl: opts.default_value_ttl.unwrap_or(d.default_value_ttl),
      remote: RemoteHandle::new(opts.remote.or_else(|| d.remote.clone())),
      encode: opts.encode.or_else(|| d.encode.clone()),
      decode: opts.decode.or_else(|| d.decode.clone()),
    }
  }
}

impl<V: Send + Sync> Drop for CacheShared<V> {
  fn drop(&mut self) {
    if let Some(sweeper) = self.sweeper.take() {
      sweeper.stop();
    }
  }
}
