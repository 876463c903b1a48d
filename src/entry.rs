use crate::clock::Clock;

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Expiration horizon used when an entry has no TTL. Far enough out that it
/// behaves as "never" while still being an ordinary `Instant`.
pub(crate) const NO_EXPIRATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A value resident in a shard, with its absolute expiration instant.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  pub(crate) value: Arc<V>,
  pub(crate) expires_at: Instant,
}

impl<V> CacheEntry<V> {
  pub(crate) fn new(value: Arc<V>, expires_at: Instant) -> Self {
    Self { value, expires_at }
  }

  /// An entry is live through its expiration instant and stale after it.
  #[inline]
  pub(crate) fn is_expired(&self, now: Instant) -> bool {
    self.expires_at < now
  }
}

/// Resolves a TTL to an absolute expiration. A zero TTL means no expiration.
#[inline]
pub(crate) fn expire_at(clock: &dyn Clock, ttl: Duration) -> Instant {
  if ttl.is_zero() {
    clock.now() + NO_EXPIRATION
  } else {
    clock.now() + ttl
  }
}
