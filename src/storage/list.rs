// Package storage provides the intrusive LRU map primitive.

use std::collections::HashMap;
use std::sync::Arc;

/// Sentinel index terminating the intrusive list.
const NIL: usize = usize::MAX;

/// Node carries the stored value and its intrusive list links.
/// Links are arena indices into the slot vector, so the structure has
/// no shared ownership and every splice is O(1).
struct Node<V> {
    key: Arc<str>,
    val: V,
    prev: usize,
    next: usize,
}

/// LruMap is a key-to-value map with most-recently-used ordering.
/// The head of the list is the most recently used entry, the tail the
/// least. Size never exceeds the configured capacity once an operation
/// completes; a capacity of zero makes every insertion evict itself.
pub struct LruMap<V> {
    cap: usize,
    map: HashMap<Arc<str>, usize>,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<V> LruMap<V> {
    /// Creates an empty map bounded to `cap` entries.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            map: HashMap::with_capacity(cap.min(1 << 20)),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Looks up a value and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        Some(&self.node(idx).val)
    }

    /// Looks up a value without touching recency order.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let idx = *self.map.get(key)?;
        Some(&self.node(idx).val)
    }

    /// Inserts or updates a value at the head of the list.
    /// Returns the replaced value for updates and the entry evicted from
    /// the tail when the insertion pushed the map over capacity.
    pub fn set(&mut self, key: &str, val: V) -> (Option<V>, Option<(Arc<str>, V)>) {
        if self.cap == 0 {
            return (None, Some((Arc::from(key), val)));
        }
        if let Some(&idx) = self.map.get(key) {
            let old = std::mem::replace(&mut self.node_mut(idx).val, val);
            self.move_to_front(idx);
            return (Some(old), None);
        }
        self.insert_arc(Arc::from(key), val)
    }

    /// Inserts a fresh entry whose key Arc is already allocated.
    /// The caller guarantees the key is absent.
    pub fn insert_arc(&mut self, key: Arc<str>, val: V) -> (Option<V>, Option<(Arc<str>, V)>) {
        if self.cap == 0 {
            return (None, Some((key, val)));
        }
        let idx = self.alloc(key.clone(), val);
        self.map.insert(key, idx);
        self.link_front(idx);
        let evicted = if self.map.len() > self.cap {
            self.pop_tail()
        } else {
            None
        };
        (None, evicted)
    }

    /// Removes a key, returning its value.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        Some(self.release(idx).val)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_tail(&mut self) -> Option<(Arc<str>, V)> {
        if self.tail == NIL {
            return None;
        }
        let idx = self.tail;
        self.unlink(idx);
        let node = self.release(idx);
        self.map.remove(&node.key);
        Some((node.key, node.val))
    }

    /// Returns the key of the least recently used entry, the admission
    /// victim candidate.
    pub fn peek_tail_key(&self) -> Option<Arc<str>> {
        if self.tail == NIL {
            return None;
        }
        Some(self.node(self.tail).key.clone())
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Visits entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &V)> + '_ {
        self.map
            .iter()
            .map(move |(key, &idx)| (key, &self.node(idx).val))
    }

    fn node(&self, idx: usize) -> &Node<V> {
        self.slots[idx].as_ref().unwrap()
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<V> {
        self.slots[idx].as_mut().unwrap()
    }

    fn alloc(&mut self, key: Arc<str>, val: V) -> usize {
        let node = Node {
            key,
            val,
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Node<V> {
        self.free.push(idx);
        self.slots[idx].take().unwrap()
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        if prev != NIL {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }
}
