use crate::policy::CachePolicy;

use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};

use ahash::RandomState;
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// Hashes a key with the store's `BuildHasher`.
#[inline]
pub(crate) fn hash_key<H: BuildHasher>(hasher: &H, key: &str) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

/// One independently locked partition of the cache: a mutex around the
/// policy instance that owns this partition's item table.
pub(crate) struct Shard<V> {
  pub(crate) policy: Mutex<Box<dyn CachePolicy<V>>>,
}

/// The fixed set of shards a cache fans out over, plus the hasher that maps
/// keys onto them and the counter of public operations in flight.
///
/// The shard count is always a power of two so selection is a mask over the
/// key hash.
pub(crate) struct ShardedStore<V> {
  pub(crate) shards: Box<[CachePadded<Shard<V>>]>,
  pub(crate) hasher: RandomState,
  pub(crate) in_flight: CachePadded<AtomicI64>,
}

impl<V> ShardedStore<V> {
  pub(crate) fn new(shards: Vec<Shard<V>>) -> Self {
    debug_assert!(shards.len().is_power_of_two());
    Self {
      shards: shards
        .into_iter()
        .map(CachePadded::new)
        .collect::<Vec<_>>()
        .into_boxed_slice(),
      hasher: RandomState::new(),
      in_flight: CachePadded::new(AtomicI64::new(0)),
    }
  }

  #[inline]
  pub(crate) fn shard_index(&self, key: &str) -> usize {
    hash_key(&self.hasher, key) as usize & (self.shards.len() - 1)
  }

  #[inline]
  pub(crate) fn shard_for(&self, key: &str) -> &Shard<V> {
    &self.shards[self.shard_index(key)]
  }

  /// Marks a public operation as in progress for the guard's lifetime. The
  /// sweeper backs off while any operation is active.
  pub(crate) fn begin_op(&self) -> FlightGuard<'_> {
    self.in_flight.fetch_add(1, Ordering::Relaxed);
    FlightGuard {
      counter: &self.in_flight,
    }
  }

  #[inline]
  pub(crate) fn ops_in_flight(&self) -> i64 {
    self.in_flight.load(Ordering::Relaxed)
  }
}

pub(crate) struct FlightGuard<'a> {
  counter: &'a AtomicI64,
}

impl Drop for FlightGuard<'_> {
  fn drop(&mut self) {
    self.counter.fetch_sub(1, Ordering::Relaxed);
  }
}
