use crate::clock::Clock;
use crate::entry::{expire_at, CacheEntry};
use crate::policy::key_list::KeyList;
use crate::policy::CachePolicy;

use ahash::{HashMap, HashMapExt};
use std::sync::Arc;
use std::time::Duration;

/// Adaptive Replacement Cache.
///
/// Resident entries live in two recency lists: T1 (seen once) and T2 (seen
/// at least twice). Keys evicted from them linger value-less in the ghost
/// lists B1 and B2. The target size of T1 is `p`; a hit in B1 grows `p`, a
/// hit in B2 shrinks it, steering eviction between recency and frequency.
/// Ghost hits are honored on `set` only. Bounds: `|T1|+|T2| <= cap`, each
/// ghost list holds at most `cap` keys, and the whole directory never
/// exceeds `2*cap`.
pub struct ArcPolicy<V> {
  clock: Arc<dyn Clock>,
  cap: usize,
  /// Target size for T1, kept in [0, cap].
  p: usize,
  items: HashMap<String, CacheEntry<V>>,
  t1: KeyList,
  t2: KeyList,
  b1: KeyList,
  b2: KeyList,
}

impl<V> ArcPolicy<V> {
  pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
    Self {
      clock,
      cap: capacity.max(1),
      p: 0,
      items: HashMap::with_capacity(capacity),
      t1: KeyList::new(),
      t2: KeyList::new(),
      b1: KeyList::new(),
      b2: KeyList::new(),
    }
  }

  fn resident_len(&self) -> usize {
    self.t1.len() + self.t2.len()
  }

  fn directory_len(&self) -> usize {
    self.t1.len() + self.t2.len() + self.b1.len() + self.b2.len()
  }

  fn is_full(&self) -> bool {
    self.resident_len() >= self.cap
  }

  /// Drops T1's tail value and remembers the key at B1's MRU end.
  fn demote_t1_tail(&mut self) {
    if let Some(victim) = self.t1.pop_back() {
      self.items.remove(&victim);
      self.b1.push_front(victim);
      if self.b1.len() > self.cap {
        self.b1.pop_back();
      }
    }
  }

  /// Drops T2's tail value and remembers the key at B2's MRU end.
  fn demote_t2_tail(&mut self) {
    if let Some(victim) = self.t2.pop_back() {
      self.items.remove(&victim);
      self.b2.push_front(victim);
      if self.b2.len() > self.cap {
        self.b2.pop_back();
      }
    }
  }

  /// Picks which resident list donates a victim, based on `p`: T1 gives one
  /// up when it is larger than its target (or exactly at it while the
  /// incoming key sits in B2), otherwise T2 does.
  fn replace(&mut self, incoming_in_b2: bool) {
    let t1_len = self.t1.len();
    if t1_len > 0 && (t1_len > self.p || (incoming_in_b2 && t1_len == self.p)) {
      self.demote_t1_tail();
    } else if self.t2.len() > 0 {
      self.demote_t2_tail();
    } else {
      self.demote_t1_tail();
    }
  }

  /// Forgets the oldest ghost when the directory is saturated.
  fn trim_directory(&mut self) {
    if self.directory_len() >= 2 * self.cap && self.b2.pop_back().is_none() {
      self.b1.pop_back();
    }
  }

  /// Cold-miss directory maintenance, run before the new key is pushed onto
  /// T1.
  fn make_room(&mut self) {
    if self.t1.len() + self.b1.len() >= self.cap {
      if self.t1.len() < self.cap {
        self.b1.pop_back();
        if self.is_full() {
          self.replace(false);
        }
      } else {
        // T1 alone fills the cache; its tail goes straight to B1.
        self.trim_directory();
        self.demote_t1_tail();
      }
    } else if self.directory_len() >= self.cap {
      self.trim_directory();
      if self.is_full() {
        self.replace(false);
      }
    }
  }

  /// Promotes a resident key on access: a T1 hit has now been seen twice and
  /// moves to T2's MRU position; a T2 hit just refreshes its recency.
  fn touch(&mut self, key: &str) {
    if self.t1.remove(key) {
      self.t2.push_front(key);
    } else {
      self.t2.move_to_front(key);
    }
  }

  fn remove_resident(&mut self, key: &str) -> bool {
    let existed = self.items.remove(key).is_some();
    if !self.t1.remove(key) {
      self.t2.remove(key);
    }
    existed
  }

  #[cfg(test)]
  fn check_invariants(&self) {
    assert!(self.p <= self.cap);
    assert!(self.resident_len() <= self.cap);
    assert!(self.b1.len() <= self.cap);
    assert!(self.b2.len() <= self.cap);
    assert!(self.directory_len() <= 2 * self.cap);
    assert_eq!(self.items.len(), self.resident_len());
  }
}

impl<V: Send + Sync> CachePolicy<V> for ArcPolicy<V> {
  fn set(&mut self, key: &str, value: Arc<V>, ttl: Duration) {
    let expires_at = expire_at(&*self.clock, ttl);

    // Resident: update in place and treat as a second sighting.
    if let Some(entry) = self.items.get_mut(key) {
      entry.value = value;
      entry.expires_at = expires_at;
      self.touch(key);
      return;
    }

    // Ghost hit in B1: recency was undervalued, grow T1's target.
    if self.b1.contains(key) {
      if self.is_full() {
        let delta = (self.b2.len() / self.b1.len()).max(1);
        self.p = (self.p + delta).min(self.cap);
        self.replace(false);
      }
      self.b1.remove(key);
      self.t2.push_front(key);
      self
        .items
        .insert(key.to_owned(), CacheEntry::new(value, expires_at));
      return;
    }

    // Ghost hit in B2: frequency was undervalued, shrink T1's target.
    if self.b2.contains(key) {
      if self.is_full() {
        let delta = (self.b1.len() / self.b2.len()).max(1);
        self.p = self.p.saturating_sub(delta);
        self.replace(true);
      }
      self.b2.remove(key);
      self.t2.push_front(key);
      self
        .items
        .insert(key.to_owned(), CacheEntry::new(value, expires_at));
      return;
    }

    // Cold miss.
    self.make_room();
    self.t1.push_front(key);
    self
      .items
      .insert(key.to_owned(), CacheEntry::new(value, expires_at));
  }

  fn get(&mut self, key: &str) -> Option<Arc<V>> {
    let now = self.clock.now();
    let (value, expired) = match self.items.get(key) {
      Some(entry) => (entry.value.clone(), entry.is_expired(now)),
      None => return None,
    };
    if expired {
      self.remove_resident(key);
      return None;
    }
    self.touch(key);
    Some(value)
  }

  fn has(&mut self, key: &str) -> bool {
    let now = self.clock.now();
    match self.items.get(key) {
      Some(entry) if entry.is_expired(now) => {
        self.remove_resident(key);
        false
      }
      Some(_) => {
        self.touch(key);
        true
      }
      None => false,
    }
  }

  fn remove(&mut self, key: &str) -> bool {
    // Ghost entries are purged too, but only a resident removal counts.
    self.b1.remove(key);
    self.b2.remove(key);
    self.remove_resident(key)
  }

  fn evict(&mut self, count: usize) -> usize {
    if self.resident_len() < self.cap {
      return 0;
    }

    let mut evicted = 0;
    while evicted < count && self.resident_len() > 0 {
      // Trim the directory as a cold miss would, then demote one resident
      // tail into its ghost list.
      if self.t1.len() + self.b1.len() >= self.cap && self.t1.len() < self.cap {
        self.b1.pop_back();
      } else {
        self.trim_directory();
      }
      self.replace(false);
      evicted += 1;
    }
    evicted
  }

  fn len(&self) -> usize {
    self.items.len()
  }
}
