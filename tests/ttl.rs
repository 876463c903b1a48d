use std::sync::Arc;
use std::time::Duration;

use tiercache::{Cache, CacheError, ManualClock, Options, PolicyKind};

fn new_cache(policy: PolicyKind) -> (Arc<ManualClock>, Cache<String>) {
  let clock = Arc::new(ManualClock::new());
  let cache = Cache::builder(16, policy)
    .shards(1)
    .clock(clock.clone())
    .build();
  (clock, cache)
}

#[test]
fn entries_expire_after_their_ttl_under_every_policy() {
  for policy in [
    PolicyKind::Simple,
    PolicyKind::Lru,
    PolicyKind::Lfu,
    PolicyKind::Arc,
  ] {
    let (clock, cache) = new_cache(policy);
    cache
      .set_with("k", "v".into(), Options::new().ttl(Duration::from_millis(100)))
      .unwrap();

    assert_eq!(cache.get("k").unwrap().value().as_str(), "v");

    clock.advance(Duration::from_millis(101));
    assert!(
      matches!(cache.get("k"), Err(CacheError::KeyNotFound)),
      "{policy:?} served an expired entry"
    );
    assert!(!cache.exists("k"));
    assert_eq!(cache.len(), 0, "{policy:?} left the expired entry resident");
  }
}

#[test]
fn zero_ttl_means_no_expiration() {
  let (clock, cache) = new_cache(PolicyKind::Lru);
  cache.set("k", "v".into()).unwrap();

  clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
  assert!(cache.exists("k"));
}

#[test]
fn builder_ttl_applies_to_plain_sets() {
  let clock = Arc::new(ManualClock::new());
  let cache: Cache<String> = Cache::builder(16, PolicyKind::Lru)
    .shards(1)
    .clock(clock.clone())
    .ttl(Duration::from_secs(5))
    .build();

  cache.set("k", "v".into()).unwrap();
  clock.advance(Duration::from_secs(4));
  assert!(cache.exists("k"));

  clock.advance(Duration::from_secs(2));
  assert!(!cache.exists("k"));
}

#[test]
fn per_call_ttl_overrides_the_builder_default() {
  let clock = Arc::new(ManualClock::new());
  let cache: Cache<String> = Cache::builder(16, PolicyKind::Lru)
    .shards(1)
    .clock(clock.clone())
    .ttl(Duration::from_secs(5))
    .build();

  cache
    .set_with("k", "v".into(), Options::new().ttl(Duration::from_secs(60)))
    .unwrap();
  clock.advance(Duration::from_secs(30));
  assert!(cache.exists("k"), "the per-call TTL should still be running");
}

#[test]
fn refreshing_a_key_extends_its_life() {
  let (clock, cache) = new_cache(PolicyKind::Lfu);
  cache
    .set_with("k", "v1".into(), Options::new().ttl(Duration::from_millis(100)))
    .unwrap();

  clock.advance(Duration::from_millis(60));
  cache
    .set_with("k", "v2".into(), Options::new().ttl(Duration::from_millis(100)))
    .unwrap();

  clock.advance(Duration::from_millis(60));
  assert_eq!(cache.get("k").unwrap().value().as_str(), "v2");
}
