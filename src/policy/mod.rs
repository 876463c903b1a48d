pub mod arc;
pub mod lfu;
pub mod lru;
pub mod simple;

mod key_list;

use crate::clock::Clock;

use std::sync::Arc;
use std::time::Duration;

/// The eviction discipline a cache is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
  /// TTL-driven eviction with an arbitrary-victim fallback.
  Simple,
  /// Least recently used.
  Lru,
  /// Least frequently used.
  Lfu,
  /// Adaptive Replacement Cache.
  Arc,
}

/// One shard's worth of eviction state.
///
/// A policy owns its item table and any bookkeeping structures, and is only
/// ever driven under the owning shard's lock, so every method takes
/// `&mut self`. Expired entries are removed eagerly by `get` and `has`
/// before they report a miss.
pub trait CachePolicy<V>: Send {
  /// Inserts or updates `key`. A fresh insert at capacity evicts exactly one
  /// entry first. A zero `ttl` means no expiration.
  fn set(&mut self, key: &str, value: Arc<V>, ttl: Duration);

  /// Returns the live value for `key`, updating any recency or frequency
  /// bookkeeping. An expired entry is removed and reported as a miss.
  fn get(&mut self, key: &str) -> Option<Arc<V>>;

  /// Like `get` but without producing the value.
  fn has(&mut self, key: &str) -> bool;

  /// Removes `key` if it holds a value, returning whether anything was
  /// removed.
  fn remove(&mut self, key: &str) -> bool;

  /// Removes up to `count` entries according to the policy's discipline and
  /// returns how many were reclaimed. A no-op below capacity.
  fn evict(&mut self, count: usize) -> usize;

  /// Number of entries currently holding a value.
  fn len(&self) -> usize;
}

/// Builds one policy instance for a shard of the given capacity.
pub(crate) fn new_policy<V: Send + Sync + 'static>(
  kind: PolicyKind,
  clock: Arc<dyn Clock>,
  capacity: usize,
) -> Box<dyn CachePolicy<V>> {
  match kind {
    PolicyKind::Simple => Box::new(simple::SimplePolicy::new(clock, capacity)),
    PolicyKind::Lru => Box::new(lru::LruPolicy::new(clock, capacity)),
    PolicyKind::Lfu => Box::new(lfu::LfuPolicy::new(clock, capacity)),
    PolicyKind::Arc => Box::new(arc::ArcPolicy::new(clock, capacity)),
  }
}
