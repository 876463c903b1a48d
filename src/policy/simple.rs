use crate::clock::Clock;
use crate::entry::{expire_at, CacheEntry};
use crate::policy::CachePolicy;

use ahash::{HashMap, HashMapExt};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A heap entry describing when a key is due to expire. Heap entries are
/// never updated in place; a stale one is recognized by comparing its
/// instant against the live entry and discarded when it surfaces.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
  at: Instant,
  key: String,
}

/// Capacity-bounded store whose eviction is TTL-driven: the earliest
/// expiring entry is reaped first, falling back to an arbitrary victim when
/// nothing has expired yet.
pub struct SimplePolicy<V> {
  clock: Arc<dyn Clock>,
  cap: usize,
  items: HashMap<String, CacheEntry<V>>,
  deadlines: BinaryHeap<Reverse<Deadline>>,
}

impl<V> SimplePolicy<V> {
  pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
    Self {
      clock,
      cap: capacity.max(1),
      items: HashMap::with_capacity(capacity + 1),
      deadlines: BinaryHeap::with_capacity(capacity + 1),
    }
  }

  fn push_deadline(&mut self, key: &str, at: Instant) {
    self.deadlines.push(Reverse(Deadline {
      at,
      key: key.to_owned(),
    }));
  }

  /// Pops stale heap entries and, when the root describes a live entry that
  /// has already expired, pops and returns its key.
  fn pop_expired_root(&mut self, now: Instant) -> Option<String> {
    loop {
      let root = match self.deadlines.peek() {
        Some(Reverse(d)) => (d.at, d.key.clone()),
        None => return None,
      };
      let live = self
        .items
        .get(&root.1)
        .map_or(false, |entry| entry.expires_at == root.0);
      if !live {
        self.deadlines.pop();
        continue;
      }
      if root.0 < now {
        self.deadlines.pop();
        return Some(root.1);
      }
      return None;
    }
  }
}

impl<V: Send + Sync> CachePolicy<V> for SimplePolicy<V> {
  fn set(&mut self, key: &str, value: Arc<V>, ttl: Duration) {
    let expires_at = expire_at(&*self.clock, ttl);

    if let Some(entry) = self.items.get_mut(key) {
      entry.value = value;
      entry.expires_at = expires_at;
    } else {
      self.evict(1);
      self
        .items
        .insert(key.to_owned(), CacheEntry::new(value, expires_at));
    }
    self.push_deadline(key, expires_at);
  }

  fn get(&mut self, key: &str) -> Option<Arc<V>> {
    let now = self.clock.now();
    match self.items.get(key) {
      Some(entry) if entry.is_expired(now) => {
        self.items.remove(key);
        None
      }
      Some(entry) => Some(entry.value.clone()),
      None => None,
    }
  }

  fn has(&mut self, key: &str) -> bool {
    let now = self.clock.now();
    match self.items.get(key) {
      Some(entry) if entry.is_expired(now) => {
        self.items.remove(key);
        false
      }
      Some(_) => true,
      None => false,
    }
  }

  fn remove(&mut self, key: &str) -> bool {
    self.items.remove(key).is_some()
  }

  fn evict(&mut self, count: usize) -> usize {
    if self.items.len() < self.cap {
      return 0;
    }

    let now = self.clock.now();
    let mut evicted = 0;
    while evicted < count && !self.items.is_empty() {
      let victim = match self.pop_expired_root(now) {
        Some(key) => key,
        // Nothing has expired; any entry will do.
        None => match self.items.keys().next() {
          Some(key) => key.clone(),
          None => break,
        },
      };
      self.items.remove(&victim);
      evicted += 1;
    }
    evicted
  }

  fn len(&self) -> usize {
    self.items.len()
  }
}
