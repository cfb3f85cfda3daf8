//! Tests for the intrusive LRU map.

#[cfg(test)]
mod tests {
    use crate::storage::list::LruMap;

    #[test]
    fn test_set_get_updates_recency() {
        let mut lru: LruMap<i32> = LruMap::new(2);
        lru.set("a", 1);
        lru.set("b", 2);
        assert_eq!(lru.get("a"), Some(&1));

        // "b" is now the tail and gets evicted by the third insert.
        let (_, evicted) = lru.set("c", 3);
        let (key, val) = evicted.expect("tail evicted");
        assert_eq!(&*key, "b");
        assert_eq!(val, 2);

        assert!(lru.contains("a"));
        assert!(lru.contains("c"));
        assert!(!lru.contains("b"));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_update_replaces_and_moves_to_head() {
        let mut lru: LruMap<i32> = LruMap::new(2);
        lru.set("a", 1);
        lru.set("b", 2);
        let (old, evicted) = lru.set("a", 10);
        assert_eq!(old, Some(1));
        assert!(evicted.is_none());

        // "b" is the tail now.
        assert_eq!(lru.peek_tail_key().as_deref(), Some("b"));
        assert_eq!(lru.get("a"), Some(&10));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_delete() {
        let mut lru: LruMap<i32> = LruMap::new(4);
        lru.set("a", 1);
        lru.set("b", 2);
        assert_eq!(lru.delete("a"), Some(1));
        assert_eq!(lru.delete("a"), None);
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.peek_tail_key().as_deref(), Some("b"));
    }

    #[test]
    fn test_pop_tail_order() {
        let mut lru: LruMap<i32> = LruMap::new(4);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);
        lru.get("a");

        let (k1, _) = lru.pop_tail().unwrap();
        let (k2, _) = lru.pop_tail().unwrap();
        let (k3, _) = lru.pop_tail().unwrap();
        assert_eq!(&*k1, "b");
        assert_eq!(&*k2, "c");
        assert_eq!(&*k3, "a");
        assert!(lru.pop_tail().is_none());
        assert!(lru.is_empty());
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut lru: LruMap<i32> = LruMap::new(0);
        let (old, evicted) = lru.set("a", 1);
        assert!(old.is_none());
        let (key, val) = evicted.expect("insertion immediately evicts");
        assert_eq!(&*key, "a");
        assert_eq!(val, 1);
        assert_eq!(lru.len(), 0);
        assert!(lru.get("a").is_none());
    }

    #[test]
    fn test_clear() {
        let mut lru: LruMap<i32> = LruMap::new(4);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.clear();
        assert_eq!(lru.len(), 0);
        assert!(lru.get("a").is_none());
        assert!(lru.peek_tail_key().is_none());

        // Reusable after clear.
        lru.set("c", 3);
        assert_eq!(lru.get("c"), Some(&3));
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut lru: LruMap<usize> = LruMap::new(8);
        for i in 0..1000 {
            lru.set(&format!("k{}", i), i);
            assert!(lru.len() <= 8);
        }
        assert_eq!(lru.len(), 8);
        // The newest 8 keys survive.
        for i in 992..1000 {
            assert!(lru.contains(&format!("k{}", i)));
        }
    }

    #[test]
    fn test_slot_reuse_after_churn() {
        let mut lru: LruMap<usize> = LruMap::new(2);
        for i in 0..100 {
            lru.set(&format!("k{}", i), i);
        }
        // The arena stays bounded: deletions and evictions recycle slots.
        assert_eq!(lru.len(), 2);
        lru.delete("k99");
        lru.set("fresh", 1);
        assert_eq!(lru.get("fresh"), Some(&1));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_peek_does_not_touch_order() {
        let mut lru: LruMap<i32> = LruMap::new(2);
        lru.set("a", 1);
        lru.set("b", 2);
        assert_eq!(lru.peek("a"), Some(&1));
        // "a" is still the tail.
        assert_eq!(lru.peek_tail_key().as_deref(), Some("a"));
    }

    #[test]
    fn test_iter_covers_all_entries() {
        let mut lru: LruMap<i32> = LruMap::new(4);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);
        let mut keys: Vec<String> = lru.iter().map(|(k, _)| k.to_string()).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
