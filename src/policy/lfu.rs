use crate::clock::Clock;
use crate::entry::expire_at;
use crate::policy::CachePolicy;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use generational_arena::{Arena, Index};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A set of keys sharing one access count. Buckets form a doubly-linked
/// list ordered by strictly increasing frequency; the head bucket holds
/// frequency zero and is never removed.
#[derive(Debug)]
struct Bucket {
  freq: u64,
  items: HashSet<String>,
  prev: Option<Index>,
  next: Option<Index>,
}

impl Bucket {
  fn new(freq: u64) -> Self {
    Self {
      freq,
      items: HashSet::new(),
      prev: None,
      next: None,
    }
  }
}

#[derive(Debug)]
struct LfuEntry<V> {
  value: Arc<V>,
  expires_at: Instant,
  bucket: Index,
}

/// Least-frequently-used eviction over a frequency-bucket list. Fresh
/// inserts land in the count-0 head bucket; each read promotes an entry by
/// one bucket, creating or merging buckets as needed. Eviction walks the
/// list from the head, expelling the coldest entries first.
pub struct LfuPolicy<V> {
  clock: Arc<dyn Clock>,
  cap: usize,
  items: HashMap<String, LfuEntry<V>>,
  buckets: Arena<Bucket>,
  head: Index,
}

impl<V> LfuPolicy<V> {
  pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
    let mut buckets = Arena::new();
    let head = buckets.insert(Bucket::new(0));
    Self {
      clock,
      cap: capacity.max(1),
      items: HashMap::with_capacity(capacity),
      buckets,
      head,
    }
  }

  /// A drained bucket is reclaimed unless it is the permanent head bucket.
  fn is_removable(&self, idx: Index) -> bool {
    let bucket = &self.buckets[idx];
    bucket.freq != 0 && bucket.items.is_empty()
  }

  fn unlink_bucket(&mut self, idx: Index) {
    if idx == self.head {
      return;
    }
    let (prev, next) = {
      let bucket = &self.buckets[idx];
      (bucket.prev, bucket.next)
    };
    if let Some(p) = prev {
      self.buckets[p].next = next;
    }
    if let Some(n) = next {
      self.buckets[n].prev = prev;
    }
    self.buckets.remove(idx);
  }

  fn insert_bucket_after(&mut self, cur: Index, freq: u64) -> Index {
    let next = self.buckets[cur].next;
    let idx = self.buckets.insert(Bucket {
      freq,
      items: HashSet::new(),
      prev: Some(cur),
      next,
    });
    self.buckets[cur].next = Some(idx);
    if let Some(n) = next {
      self.buckets[n].prev = Some(idx);
    }
    idx
  }

  /// Moves `key` from its current bucket to the one holding the next
  /// frequency, creating it, merging into it, or re-labeling the drained
  /// current bucket when that keeps the list ordered.
  fn increment(&mut self, key: &str) {
    let cur = match self.items.get(key) {
      Some(entry) => entry.bucket,
      None => return,
    };
    let next_freq = self.buckets[cur].freq + 1;
    self.buckets[cur].items.remove(key);
    let removable = self.is_removable(cur);

    let next = self.buckets[cur].next;
    // The successor's frequency is always at least next_freq, so it either
    // matches exactly or the new count needs a bucket of its own.
    let target = match next {
      Some(n) if self.buckets[n].freq == next_freq => {
        if removable {
          self.unlink_bucket(cur);
        }
        n
      }
      _ => {
        if removable {
          self.buckets[cur].freq = next_freq;
          cur
        } else {
          self.insert_bucket_after(cur, next_freq)
        }
      }
    };

    self.buckets[target].items.insert(key.to_owned());
    if let Some(entry) = self.items.get_mut(key) {
      entry.bucket = target;
    }
  }

  fn remove_item(&mut self, key: &str) -> bool {
    match self.items.remove(key) {
      Some(entry) => {
        self.buckets[entry.bucket].items.remove(key);
        if self.is_removable(entry.bucket) {
          self.unlink_bucket(entry.bucket);
        }
        true
      }
      None => false,
    }
  }

  /// Bucket frequencies and sizes from the head onward.
  #[cfg(test)]
  fn bucket_shape(&self) -> Vec<(u64, usize)> {
    let mut shape = Vec::new();
    let mut cursor = Some(self.head);
    while let Some(idx) = cursor {
      let bucket = &self.buckets[idx];
      shape.push((bucket.freq, bucket.items.len()));
      cursor = bucket.next;
    }
    shape
  }
}

impl<V: Send + Sync> CachePolicy<V> for LfuPolicy<V> {
  fn set(&mut self, key: &str, value: Arc<V>, ttl: Duration) {
    let expires_at = expire_at(&*self.clock, ttl);

    if let Some(entry) = self.items.get_mut(key) {
      entry.value = value;
      entry.expires_at = expires_at;
      return;
    }

    self.evict(1);
    self.buckets[self.head].items.insert(key.to_owned());
    self.items.insert(
      key.to_owned(),
      LfuEntry {
        value,
        expires_at,
        bucket: self.head,
      },
    );
  }

  fn get(&mut self, key: &str) -> Option<Arc<V>> {
    let now = self.clock.now();
    let (value, expired) = match self.items.get(key) {
      Some(entry) => (entry.value.clone(), entry.expires_at < now),
      None => return None,
    };
    if expired {
      self.remove_item(key);
      return None;
    }
    self.increment(key);
    Some(value)
  }

  fn has(&mut self, key: &str) -> bool {
    let now = self.clock.now();
    match self.items.get(key) {
      Some(entry) if entry.expires_at < now => {
        self.remove_item(key);
        false
      }
      Some(_) => true,
      None => false,
    }
  }

  fn remove(&mut self, key: &str) -> bool {
    self.remove_item(key)
  }

  fn evict(&mut self, count: usize) -> usize {
    if self.items.len() < self.cap {
      return 0;
    }

    // Collect victims first; removing while walking would invalidate the
    // bucket being iterated.
    let mut victims = Vec::with_capacity(count.min(self.items.len()));
    let mut cursor = Some(self.head);
    'walk: while let Some(idx) = cursor {
      for key in &self.buckets[idx].items {
        if victims.len() >= count {
          break 'walk;
        }
        victims.push(key.clone());
      }
      cursor = self.buckets[idx].next;
    }

    for key in &victims {
      self.remove_item(key);
    }
    victims.len()
  }

  fn len(&self) -> usize {
    self.items.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::ManualClock;

  fn new_policy(cap: usize) -> (Arc<ManualClock>, LfuPolicy<i32>) {
    let clock = Arc::new(ManualClock::new());
    let policy = LfuPolicy::new(clock.clone(), cap);
    (clock, policy)
  }

  #[test]
  fn cold_key_is_evicted_before_hot_key() {
    // Cap 2: a is read twice, b never. Inserting c expels b.
    let (_, mut policy) = new_policy(2);
    policy.set("a", Arc::new(1), Duration::ZERO);
    policy.set("b", Arc::new(2), Duration::ZERO);
    assert!(policy.get("a").is_some());
    assert!(policy.get("a").is_some());

    policy.set("c", Arc::new(3), Duration::ZERO);

    assert!(policy.get("a").is_some());
    assert!(policy.get("b").is_none(), "b had the lowest count");
    assert!(policy.get("c").is_some());
  }

  #[test]
  fn head_bucket_survives_everything() {
    let (_, mut policy) = new_policy(2);
    policy.set("a", Arc::new(1), Duration::ZERO);
    policy.get("a");
    policy.remove("a");

    assert_eq!(policy.bucket_shape(), vec![(0, 0)]);
    assert_eq!(policy.len(), 0);
  }

  #[test]
  fn promotion_relabels_a_drained_bucket() {
    // A single key climbing alone re-uses its drained bucket instead of
    // allocating a new one per count.
    let (_, mut policy) = new_policy(4);
    policy.set("k", Arc::new(1), Duration::ZERO);
    assert_eq!(policy.bucket_shape(), vec![(0, 1)]);

    policy.get("k");
    assert_eq!(policy.bucket_shape(), vec![(0, 0), (1, 1)]);

    policy.get("k");
    assert_eq!(policy.bucket_shape(), vec![(0, 0), (2, 1)]);

    policy.get("k");
    assert_eq!(policy.bucket_shape(), vec![(0, 0), (3, 1)]);
  }

  #[test]
  fn promotion_merges_into_an_existing_bucket() {
    let (_, mut policy) = new_policy(4);
    policy.set("x", Arc::new(1), Duration::ZERO);
    policy.set("y", Arc::new(2), Duration::ZERO);
    policy.get("x");
    policy.get("y");
    assert_eq!(policy.bucket_shape(), vec![(0, 0), (1, 2)]);

    policy.get("x");
    assert_eq!(policy.bucket_shape(), vec![(0, 0), (1, 1), (2, 1)]);

    // y's promotion drains the count-1 bucket, which merges away.
    policy.get("y");
    assert_eq!(policy.bucket_shape(), vec![(0, 0), (2, 2)]);
  }

  #[test]
  fn eviction_walks_from_the_coldest_bucket() {
    let (_, mut policy) = new_policy(3);
    policy.set("a", Arc::new(1), Duration::ZERO);
    policy.set("b", Arc::new(2), Duration::ZERO);
    policy.set("c", Arc::new(3), Duration::ZERO);
    policy.get("a");
    policy.get("b");

    // Only c sits at count 0; it must be the first victim.
    assert_eq!(policy.evict(1), 1);
    assert!(policy.get("c").is_none());
    assert!(policy.get("a").is_some());
    assert!(policy.get("b").is_some());
  }

  #[test]
  fn expired_entry_is_reaped_on_get() {
    let (clock, mut policy) = new_policy(4);
    policy.set("k", Arc::new(1), Duration::from_millis(100));
    policy.get("k");

    clock.advance(Duration::from_millis(101));
    assert!(policy.get("k").is_none());
    assert_eq!(policy.len(), 0);
    assert_eq!(
      policy.bucket_shape(),
      vec![(0, 0)],
      "the drained count-1 bucket is reclaimed"
    );
  }

  #[test]
  fn update_keeps_frequency() {
    let (_, mut policy) = new_policy(2);
    policy.set("a", Arc::new(1), Duration::ZERO);
    policy.get("a");
    policy.set("a", Arc::new(10), Duration::ZERO);

    assert_eq!(policy.bucket_shape(), vec![(0, 0), (1, 1)]);
    assert_eq!(policy.get("a").as_deref(), Some(&10));
  }

  #[test]
  fn capacity_is_bounded_under_churn() {
    let (_, mut policy) = new_policy(8);
    for i in 0..40 {
      policy.set(&format!("key-{i}"), Arc::new(i), Duration::ZERO);
    }
    assert!(policy.len() <= 8);
    let shape = policy.bucket_shape();
    assert_eq!(shape[0].0, 0, "head bucket keeps frequency zero");
    let tracked: usize = shape.iter().map(|(_, len)| len).sum();
    assert_eq!(tracked, policy.len(), "buckets and table move together");
  }
}
