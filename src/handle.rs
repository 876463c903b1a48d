use crate::builder::CacheBuilder;
use crate::error::{CacheError, Result};
use crate::loader::{self, LoadOutcome};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::options::Options;
use crate::policy::PolicyKind;
use crate::remote::RemoteHandle;
use crate::shared::CacheShared;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A successful lookup, distinguishing a real value from the configured
/// fallback so callers can tell a degraded answer from a fresh one.
#[derive(Debug)]
pub enum Fetched<V> {
  /// Served from a local shard, the remote tier, or the user loader.
  Hit(Arc<V>),
  /// The loader failed and the configured default value stood in.
  Default(Arc<V>),
}

impl<V> Fetched<V> {
  pub fn value(&self) -> &Arc<V> {
    match self {
      Fetched::Hit(value) | Fetched::Default(value) => value,
    }
  }

  pub fn into_value(self) -> Arc<V> {
    match self {
      Fetched::Hit(value) | Fetched::Default(value) => value,
    }
  }

  pub fn is_default(&self) -> bool {
    matches!(self, Fetched::Default(_))
  }
}

/// A sharded in-process cache.
///
/// Keys hash onto a fixed set of shards, each owning one eviction policy
/// instance behind its own lock. Handles are cheap to clone and share one
/// underlying cache.
pub struct Cache<V: Send + Sync + 'static> {
  pub(crate) shared: Arc<CacheShared<V>>,
}

impl<V: Send + Sync + 'static> Clone for Cache<V> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<V: Send + Sync + 'static> fmt::Debug for Cache<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache")
      .field("shards", &self.shared.store.shards.len())
      .finish_non_exhaustive()
  }
}

impl<V: Send + Sync + 'static> Cache<V> {
  /// Starts building a cache of `total_entries` capacity under the given
  /// eviction policy. A zero `total_entries` selects the default capacity.
  pub fn builder(total_entries: usize, policy: PolicyKind) -> CacheBuilder<V> {
    CacheBuilder::new(total_entries, policy)
  }

  /// Stores `value` under `key` with the cache-level defaults.
  pub fn set(&self, key: &str, value: V) -> Result<()> {
    self.set_with(key, value, Options::new())
  }

  /// Stores `value` under `key`, with per-call overrides.
  ///
  /// When a remote tier is configured the write goes there first; any
  /// remote failure short-circuits the local write and is surfaced.
  pub fn set_with(&self, key: &str, value: V, opts: Options<V>) -> Result<()> {
    let _op = self.shared.store.begin_op();
    let o = self.shared.resolve(opts);
    let value = Arc::new(value);

    if o.remote.is_configured() {
      let encode = o.encode.as_ref().ok_or(CacheError::CodecRequired)?;
      let bytes = encode(&value).map_err(CacheError::Remote)?;
      o.remote.set(key, &bytes, o.ttl)?;
    }

    let shard = self.shared.store.shard_for(key);
    shard.policy.lock().set(key, value, o.ttl);
    Metrics::incr(&self.shared.metrics.inserts);
    Ok(())
  }

  /// Stores each `values[i]` under `keys[i]`.
  pub fn mset(&self, keys: &[String], values: Vec<V>) -> Result<()> {
    self.mset_with(keys, values, Options::new())
  }

  /// Stores each `values[i]` under `keys[i]`, with per-call overrides.
  /// Shard locks are taken one key at a time, never two at once.
  pub fn mset_with(&self, keys: &[String], values: Vec<V>, opts: Options<V>) -> Result<()> {
    if keys.len() != values.len() {
      return Err(CacheError::KeyValueLenMismatch);
    }

    let _op = self.shared.store.begin_op();
    let o = self.shared.resolve(opts);
    let values: Vec<Arc<V>> = values.into_iter().map(Arc::new).collect();

    if o.remote.is_configured() {
      let encode = o.encode.as_ref().ok_or(CacheError::CodecRequired)?;
      let mut entries = Vec::with_capacity(keys.len());
      for (key, value) in keys.iter().zip(values.iter()) {
        entries.push((key.clone(), encode(value).map_err(CacheError::Remote)?));
      }
      o.remote.mset(&entries, o.ttl)?;
    }

    for (key, value) in keys.iter().zip(values) {
      let shard = self.shared.store.shard_for(key);
      shard.policy.lock().set(key, value, o.ttl);
      Metrics::incr(&self.shared.metrics.inserts);
    }
    Ok(())
  }

  /// Looks up `key`, consulting the loader-through protocol on a local
  /// miss. See [`get_with`](Cache::get_with).
  pub fn get(&self, key: &str) -> Result<Fetched<V>> {
    self.get_with(key, Options::new())
  }

  /// Looks up `key` with per-call overrides.
  ///
  /// On a local miss the composed loader runs outside the shard lock:
  /// remote tier first, then the user loader (whose result is written back
  /// to the remote tier), then the configured default value. Whatever it
  /// produces is inserted locally before returning; a served default is
  /// cached for the default-value TTL and marked [`Fetched::Default`].
  pub fn get_with(&self, key: &str, opts: Options<V>) -> Result<Fetched<V>> {
    let _op = self.shared.store.begin_op();
    let o = self.shared.resolve(opts);
    let shard = self.shared.store.shard_for(key);

    let cached = shard.policy.lock().get(key);
    if let Some(value) = cached {
      Metrics::incr(&self.shared.metrics.hits);
      return Ok(Fetched::Hit(value));
    }
    Metrics::incr(&self.shared.metrics.misses);

    match loader::load_one(&o, key, &self.shared.metrics)? {
      None => Err(CacheError::KeyNotFound),
      Some(LoadOutcome::Loaded(value)) => {
        shard.policy.lock().set(key, value.clone(), o.ttl);
        Metrics::incr(&self.shared.metrics.inserts);
        Ok(Fetched::Hit(value))
      }
      Some(LoadOutcome::Defaulted(value)) => {
        shard
          .policy
          .lock()
          .set(key, value.clone(), o.default_value_ttl);
        Metrics::incr(&self.shared.metrics.inserts);
        Ok(Fetched::Default(value))
      }
    }
  }

  /// Looks up every key, filling local misses through the batch loader.
  /// Keys that cannot be produced are simply absent from the result.
  pub fn mget(&self, keys: &[String]) -> Result<HashMap<String, Arc<V>>> {
    self.mget_with(keys, Options::new())
  }

  /// Like [`mget`](Cache::mget), with per-call overrides.
  pub fn mget_with(&self, keys: &[String], opts: Options<V>) -> Result<HashMap<String, Arc<V>>> {
    let _op = self.shared.store.begin_op();
    let o = self.shared.resolve(opts);

    let mut found = HashMap::with_capacity(keys.len());
    let mut missed: Vec<String> = Vec::new();
    for key in keys {
      let shard = self.shared.store.shard_for(key);
      let cached = shard.policy.lock().get(key);
      match cached {
        Some(value) => {
          Metrics::incr(&self.shared.metrics.hits);
          found.insert(key.clone(), value);
        }
        None => {
          Metrics::incr(&self.shared.metrics.misses);
          missed.push(key.clone());
        }
      }
    }

    if !missed.is_empty() {
      if let Some(loaded) = loader::load_many(&o, &missed, &self.shared.metrics) {
        for (key, value) in loaded {
          let shard = self.shared.store.shard_for(&key);
          shard.policy.lock().set(&key, value.clone(), o.ttl);
          Metrics::incr(&self.shared.metrics.inserts);
          found.insert(key, value);
        }
      }
    }
    Ok(found)
  }

  /// Removes `key`, returning whether it was present locally. A configured
  /// remote tier is deleted from first; its failure aborts the local
  /// removal.
  pub fn remove(&self, key: &str) -> Result<bool> {
    let _op = self.shared.store.begin_op();

    let remote = RemoteHandle::new(self.shared.defaults.remote.clone());
    match remote.del(key) {
      Err(err) if !err.is_unconfigured() => return Err(err),
      _ => {}
    }

    let removed = self.shared.store.shard_for(key).policy.lock().remove(key);
    if removed {
      Metrics::incr(&self.shared.metrics.invalidations);
    }
    Ok(removed)
  }

  /// Removes every key, returning whether all of them were present locally.
  pub fn mremove(&self, keys: &[String]) -> Result<bool> {
    let _op = self.shared.store.begin_op();

    let remote = RemoteHandle::new(self.shared.defaults.remote.clone());
    match remote.mdel(keys) {
      Err(err) if !err.is_unconfigured() => return Err(err),
      _ => {}
    }

    let mut all = true;
    for key in keys {
      let removed = self.shared.store.shard_for(key).policy.lock().remove(key);
      if removed {
        Metrics::incr(&self.shared.metrics.invalidations);
      } else {
        all = false;
      }
    }
    Ok(all)
  }

  /// Whether `key` is present and live in its local shard.
  pub fn exists(&self, key: &str) -> bool {
    let _op = self.shared.store.begin_op();
    self.shared.store.shard_for(key).policy.lock().has(key)
  }

  /// Number of entries currently resident across all shards.
  pub fn len(&self) -> usize {
    self
      .shared
      .store
      .shards
      .iter()
      .map(|shard| shard.policy.lock().len())
      .sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The shard a key maps to. Stable for the lifetime of this process.
  pub fn shard_index(&self, key: &str) -> usize {
    self.shared.store.shard_index(key)
  }

  /// A point-in-time snapshot of the cache's counters.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
