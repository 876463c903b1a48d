use tiercache::{Cache, CacheError, PolicyKind};

fn new_cache(capacity: usize) -> Cache<i32> {
  Cache::builder(capacity, PolicyKind::Lru).shards(1).build()
}

#[test]
fn set_get_roundtrip() {
  let cache = new_cache(16);
  cache.set("answer", 42).unwrap();

  let fetched = cache.get("answer").unwrap();
  assert_eq!(**fetched.value(), 42);
  assert!(!fetched.is_default());
}

#[test]
fn get_missing_key_reports_not_found() {
  let cache = new_cache(16);
  assert!(matches!(cache.get("nope"), Err(CacheError::KeyNotFound)));
}

#[test]
fn remove_then_exists_is_false() {
  let cache = new_cache(16);
  cache.set("k", 1).unwrap();
  assert!(cache.exists("k"));

  assert!(cache.remove("k").unwrap());
  assert!(!cache.exists("k"));
  assert!(!cache.remove("k").unwrap(), "removing a non-member is false");
}

#[test]
fn mset_rejects_mismatched_lengths() {
  let cache = new_cache(16);
  let keys = vec!["a".to_string(), "b".to_string()];
  assert!(matches!(
    cache.mset(&keys, vec![1]),
    Err(CacheError::KeyValueLenMismatch)
  ));
}

#[test]
fn mset_and_mget_roundtrip() {
  let cache = new_cache(16);
  let keys: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
  cache.mset(&keys, vec![1, 2, 3]).unwrap();

  let found = cache.mget(&keys).unwrap();
  assert_eq!(found.len(), 3);
  assert_eq!(**found.get("b").unwrap(), 2);
}

#[test]
fn mget_preserves_the_set_of_present_keys_exactly() {
  let cache = new_cache(16);
  cache.set("a", 1).unwrap();
  cache.set("c", 3).unwrap();

  let query: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
  let found = cache.mget(&query).unwrap();

  assert_eq!(found.len(), 2, "no spurious additions");
  assert!(found.contains_key("a"));
  assert!(found.contains_key("c"));
  assert!(!found.contains_key("b"));
  assert!(!found.contains_key("d"));
}

#[test]
fn mremove_reports_whether_all_existed() {
  let cache = new_cache(16);
  cache.set("a", 1).unwrap();
  cache.set("b", 2).unwrap();

  let both: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
  assert!(cache.mremove(&both).unwrap());
  assert!(!cache.exists("a"));
  assert!(!cache.exists("b"));

  cache.set("a", 1).unwrap();
  let mixed: Vec<String> = ["a", "ghost"].iter().map(|s| s.to_string()).collect();
  assert!(!cache.mremove(&mixed).unwrap());
  assert!(!cache.exists("a"), "present keys are removed regardless");
}

#[test]
fn capacity_bounds_the_entry_count() {
  let cache = new_cache(8);
  for i in 0..30 {
    cache.set(&format!("key-{i}"), i).unwrap();
  }
  assert!(cache.len() <= 8);
}

#[test]
fn shard_index_is_stable_within_a_process() {
  let cache: Cache<i32> = Cache::builder(10_000, PolicyKind::Simple).build();
  for key in ["a", "b", "busy-key", ""] {
    let first = cache.shard_index(key);
    for _ in 0..32 {
      assert_eq!(cache.shard_index(key), first);
    }
  }
}

#[test]
fn keys_spread_across_shards() {
  let cache: Cache<i32> = Cache::builder(10_000, PolicyKind::Lru).build();
  let mut seen = std::collections::HashSet::new();
  for i in 0..256 {
    seen.insert(cache.shard_index(&format!("key-{i}")));
  }
  assert!(seen.len() > 1, "a fixed shard would defeat sharding");
}

#[test]
fn cloned_handles_share_state() {
  let cache = new_cache(16);
  let other = cache.clone();

  cache.set("k", 7).unwrap();
  assert_eq!(**other.get("k").unwrap().value(), 7);

  other.remove("k").unwrap();
  assert!(!cache.exists("k"));
}

#[test]
fn metrics_track_the_basics() {
  let cache = new_cache(16);
  cache.set("k", 1).unwrap();
  let _ = cache.get("k");
  let _ = cache.get("missing");
  cache.remove("k").unwrap();

  let snapshot = cache.metrics();
  assert_eq!(snapshot.inserts, 1);
  assert_eq!(snapshot.hits, 1);
  assert_eq!(snapshot.misses, 1);
  assert_eq!(snapshot.invalidations, 1);
}

#[test]
fn writes_serialize_through_the_shard_lock() {
  use std::sync::Arc;

  let cache = Arc::new(new_cache(1024));
  let threads: Vec<_> = (0..8)
    .map(|t| {
      let cache = cache.clone();
      std::thread::spawn(move || {
        for i in 0..200 {
          let key = format!("key-{}", i % 50);
          cache.set(&key, t * 1000 + i).unwrap();
          let _ = cache.get(&key);
        }
      })
    })
    .collect();
  for t in threads {
    t.join().unwrap();
  }

  // Every key observed its last write; exact values are racy but every
  // present key must be readable.
  for i in 0..50 {
    assert!(cache.exists(&format!("key-{i}")));
  }
}
