use crate::clock::Clock;
use crate::entry::{expire_at, CacheEntry};
use crate::policy::key_list::KeyList;
use crate::policy::CachePolicy;

use ahash::{HashMap, HashMapExt};
use std::sync::Arc;
use std::time::Duration;

/// Least-recently-used eviction. A recency list keeps the most recently
/// touched key at its head; the item table and the list move together under
/// every mutation.
pub struct LruPolicy<V> {
  clock: Arc<dyn Clock>,
  cap: usize,
  items: HashMap<String, CacheEntry<V>>,
  recency: KeyList,
}

impl<V> LruPolicy<V> {
  pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
    Self {
      clock,
      cap: capacity.max(1),
      items: HashMap::with_capacity(capacity + 1),
      recency: KeyList::new(),
    }
  }

  fn remove_entry(&mut self, key: &str) -> bool {
    let existed = self.items.remove(key).is_some();
    self.recency.remove(key);
    existed
  }
}

impl<V: Send + Sync> CachePolicy<V> for LruPolicy<V> {
  fn set(&mut self, key: &str, value: Arc<V>, ttl: Duration) {
    let expires_at = expire_at(&*self.clock, ttl);

    if let Some(entry) = self.items.get_mut(key) {
      entry.value = value;
      entry.expires_at = expires_at;
      self.recency.move_to_front(key);
    } else {
      self.evict(1);
      self
        .items
        .insert(key.to_owned(), CacheEntry::new(value, expires_at));
      self.recency.push_front(key);
    }
  }

  fn get(&mut self, key: &str) -> Option<Arc<V>> {
    let now = self.clock.now();
    match self.items.get(key) {
      Some(entry) if entry.is_expired(now) => {
        self.remove_entry(key);
        None
      }
      Some(entry) => {
        let value = entry.value.clone();
        self.recency.move_to_front(key);
        Some(value)
      }
      None => None,
    }
  }

  fn has(&mut self, key: &str) -> bool {
    let now = self.clock.now();
    match self.items.get(key) {
      Some(entry) if entry.is_expired(now) => {
        self.remove_entry(key);
        false
      }
      Some(_) => true,
      None => false,
    }
  }

  fn remove(&mut self, key: &str) -> bool {
    self.remove_entry(key)
  }

  fn evict(&mut self, count: usize) -> usize {
    if self.recency.len() < self.cap {
      return 0;
    }

    let mut evicted = 0;
    for _ in 0..count {
      match self.recency.pop_back() {
        Some(victim) => {
          self.items.remove(&victim);
          evicted += 1;
        }
        None => break,
      }
    }
    evicted
  }

  fn len(&self) -> usize {
    self.items.len()
  }
}
