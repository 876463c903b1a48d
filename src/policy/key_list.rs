use ahash::{HashMap, HashMapExt};
use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node {
  key: String,
  next: Option<Index>,
  prev: Option<Index>,
}

/// An ordered list of keys with O(1) lookup, removal, and reordering.
///
/// Nodes live in an arena and link to each other by index, so no node ever
/// owns another. The head is the most recently used key, the tail the least.
#[derive(Debug)]
pub(crate) struct KeyList {
  nodes: Arena<Node>,
  lookup: HashMap<String, Index>,
  head: Option<Index>,
  tail: Option<Index>,
}

impl KeyList {
  pub fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::new(),
      head: None,
      tail: None,
    }
  }

  pub fn len(&self) -> usize {
    self.lookup.len()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.lookup.contains_key(key)
  }

  /// Unlinks a node from the chain without touching the arena or lookup map.
  fn unlink(&mut self, index: Index) {
    let (prev, next) = {
      let node = &self.nodes[index];
      (node.prev, node.next)
    };

    if let Some(prev_idx) = prev {
      self.nodes[prev_idx].next = next;
    } else {
      self.head = next;
    }

    if let Some(next_idx) = next {
      self.nodes[next_idx].prev = prev;
    } else {
      self.tail = prev;
    }
  }

  fn push_front_node(&mut self, index: Index) {
    let old_head = self.head;
    self.nodes[index].next = old_head;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head {
      self.nodes[old_head].prev = Some(index);
    }
    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  /// Inserts the key at the head, or moves it there if already present.
  pub fn push_front(&mut self, key: impl Into<String>) {
    let key = key.into();
    if let Some(&index) = self.lookup.get(&key) {
      if self.head != Some(index) {
        self.unlink(index);
        self.push_front_node(index);
      }
      return;
    }

    let index = self.nodes.insert(Node {
      key: key.clone(),
      next: None,
      prev: None,
    });
    self.lookup.insert(key, index);
    self.push_front_node(index);
  }

  /// Moves an existing key to the head. Unknown keys are ignored.
  pub fn move_to_front(&mut self, key: &str) {
    if let Some(&index) = self.lookup.get(key) {
      if self.head != Some(index) {
        self.unlink(index);
        self.push_front_node(index);
      }
    }
  }

  /// Removes and returns the tail (least recently used) key.
  pub fn pop_back(&mut self) -> Option<String> {
    let tail = self.tail?;
    self.unlink(tail);
    let node = self.nodes.remove(tail)?;
    self.lookup.remove(&node.key);
    Some(node.key)
  }

  /// Removes the key, returning whether it was present.
  pub fn remove(&mut self, key: &str) -> bool {
    if let Some(index) = self.lookup.remove(key) {
      self.unlink(index);
      self.nodes.remove(index);
      true
    } else {
      false
    }
  }

  /// Key order from head (MRU) to tail (LRU).
  #[cfg(test)]
  pub(crate) fn keys_as_vec(&self) -> Vec<String> {
    let mut keys = Vec::with_capacity(self.len());
    let mut current = self.head;
    while let Some(index) = current {
      keys.push(self.nodes[index].key.clone());
      current = self.nodes[index].next;
    }
    keys
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_list_is_empty() {
    let list = KeyList::new();
    assert_eq!(list.len(), 0);
    assert!(!list.contains("a"));
    assert!(list.keys_as_vec().is_empty());
  }

  #[test]
  fn push_front_orders_newest_first() {
    let mut list = KeyList::new();
    list.push_front("a");
    list.push_front("b");
    list.push_front("c");
    assert_eq!(list.keys_as_vec(), vec!["c", "b", "a"]);
    assert_eq!(list.len(), 3);
  }

  #[test]
  fn push_front_existing_key_moves_it() {
    let mut list = KeyList::new();
    list.push_front("a");
    list.push_front("b");
    list.push_front("c");

    list.push_front("a");
    assert_eq!(list.keys_as_vec(), vec!["a", "c", "b"]);
    assert_eq!(list.len(), 3, "no duplicate node is created");
  }

  #[test]
  fn move_to_front_reorders() {
    let mut list = KeyList::new();
    list.push_front("a");
    list.push_front("b");
    list.push_front("c");

    list.move_to_front("a");
    assert_eq!(list.keys_as_vec(), vec!["a", "c", "b"]);

    // Head stays put.
    list.move_to_front("a");
    assert_eq!(list.keys_as_vec(), vec!["a", "c", "b"]);

    // Unknown keys are ignored.
    list.move_to_front("zzz");
    assert_eq!(list.len(), 3);
  }

  #[test]
  fn pop_back_returns_lru() {
    let mut list = KeyList::new();
    list.push_front("a");
    list.push_front("b");
    list.push_front("c");

    assert_eq!(list.pop_back().as_deref(), Some("a"));
    assert_eq!(list.pop_back().as_deref(), Some("b"));
    assert_eq!(list.pop_back().as_deref(), Some("c"));
    assert_eq!(list.pop_back(), None);
    assert_eq!(list.len(), 0);
  }

  #[test]
  fn remove_middle_and_ends() {
    let mut list = KeyList::new();
    list.push_front("a");
    list.push_front("b");
    list.push_front("c");

    assert!(list.remove("b"));
    assert_eq!(list.keys_as_vec(), vec!["c", "a"]);

    assert!(list.remove("c"));
    assert_eq!(list.keys_as_vec(), vec!["a"]);

    assert!(list.remove("a"));
    assert!(list.keys_as_vec().is_empty());
    assert!(!list.remove("a"));
  }
}
