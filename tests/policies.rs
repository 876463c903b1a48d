use tiercache::{Cache, PolicyKind};

fn new_cache(capacity: usize, policy: PolicyKind) -> Cache<i32> {
  Cache::builder(capacity, policy).shards(1).build()
}

#[test]
fn lru_evicts_the_least_recently_used_key() {
  // Cap 3: set a, b, c, read a, set d. Expect a, c, d present and b gone.
  let cache = new_cache(3, PolicyKind::Lru);
  cache.set("a", 1).unwrap();
  cache.set("b", 2).unwrap();
  cache.set("c", 3).unwrap();

  assert!(cache.get("a").is_ok());
  cache.set("d", 4).unwrap();

  assert!(cache.exists("a"));
  assert!(!cache.exists("b"), "b was the LRU entry");
  assert!(cache.exists("c"));
  assert!(cache.exists("d"));
}

#[test]
fn lfu_evicts_the_least_frequently_used_key() {
  // Cap 2: a read twice, b never. Setting c expels b.
  let cache = new_cache(2, PolicyKind::Lfu);
  cache.set("a", 1).unwrap();
  cache.set("b", 2).unwrap();
  assert!(cache.get("a").is_ok());
  assert!(cache.get("a").is_ok());

  cache.set("c", 3).unwrap();

  assert!(cache.exists("a"));
  assert!(!cache.exists("b"));
  assert!(cache.exists("c"));
}

#[test]
fn arc_ghost_hit_restores_the_key() {
  // Cap 2: the third insert ghosts a. Re-setting a brings it back as a
  // frequent entry.
  let cache = new_cache(2, PolicyKind::Arc);
  cache.set("a", 1).unwrap();
  cache.set("b", 2).unwrap();
  cache.set("c", 3).unwrap();

  assert!(!cache.exists("a"), "a was evicted to a ghost list");

  cache.set("a", 9).unwrap();
  assert_eq!(**cache.get("a").unwrap().value(), 9);
}

#[test]
fn every_policy_bounds_its_capacity() {
  for policy in [
    PolicyKind::Simple,
    PolicyKind::Lru,
    PolicyKind::Lfu,
    PolicyKind::Arc,
  ] {
    let cache = new_cache(8, policy);
    for i in 0..40 {
      cache.set(&format!("key-{i}"), i).unwrap();
    }
    assert!(
      cache.len() <= 8,
      "{policy:?} exceeded its capacity: {}",
      cache.len()
    );
  }
}

#[test]
fn every_policy_updates_in_place() {
  for policy in [
    PolicyKind::Simple,
    PolicyKind::Lru,
    PolicyKind::Lfu,
    PolicyKind::Arc,
  ] {
    let cache = new_cache(4, policy);
    cache.set("k", 1).unwrap();
    cache.set("k", 2).unwrap();
    assert_eq!(cache.len(), 1, "{policy:?} duplicated an updated key");
    assert_eq!(**cache.get("k").unwrap().value(), 2);
  }
}
