use std::{
    borrow::Borrow,
    hash::Hash,
    num::NonZeroUsize,
};

use crate::{
    Error,
    IntoIter,
    Iter,
    Result,
    linked_hashmap::LinkedHashMap,
};

/// A fixed-capacity least-recently-used cache.
///
/// Every [`get`](Self::get) and [`put`](Self::put) marks the touched key as
/// most recently used. Inserting a new key into a full cache evicts the
/// entry that was touched longest ago. Inspection methods such as
/// [`peek`](Self::peek), [`contains_key`](Self::contains_key) and
/// [`iter`](Self::iter) leave the recency order alone.
///
/// # Time Complexity
/// - Get/Put/Evict: O(1) average
/// - Peek/Contains: O(1) average
///
/// # Examples
///
/// ```
/// use lru_slab::LruCache;
///
/// let mut cache = LruCache::new(2)?;
/// cache.put("key1", "value1");
/// cache.put("key2", "value2");
///
/// cache.get("key1"); // key2 is now the least recently used
/// cache.put("key3", "value3"); // evicts key2
///
/// assert_eq!(cache.get("key2"), None);
/// assert_eq!(cache.get("key1"), Some(&"value1"));
/// assert_eq!(cache.get("key3"), Some(&"value3"));
/// # Ok::<(), lru_slab::Error>(())
/// ```
pub struct LruCache<K, V> {
    map: LinkedHashMap<K, V>,
    capacity: NonZeroUsize,
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("map", &self.map)
            .finish()
    }
}

impl<K: Clone, V: Clone> Clone for LruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            capacity: self.capacity,
        }
    }
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is zero. Callers
    /// starting from a signed integer can convert with `usize::try_from(..)?`,
    /// which maps negative values to the same error.
    ///
    /// # Examples
    ///
    /// ```
    /// use lru_slab::{Error, LruCache};
    ///
    /// let cache = LruCache::<String, u32>::new(100)?;
    /// assert_eq!(cache.capacity(), 100);
    ///
    /// assert!(matches!(
    ///     LruCache::<String, u32>::new(0),
    ///     Err(Error::InvalidArgument(_))
    /// ));
    ///
    /// fn from_signed(capacity: i64) -> lru_slab::Result<LruCache<String, u32>> {
    ///     LruCache::new(usize::try_from(capacity)?)
    /// }
    /// assert!(from_signed(-1).is_err());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(Error::zero_capacity)?;
        Ok(Self::with_capacity(capacity))
    }

    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// Storage for small capacities is reserved up front. Large caches grow
    /// their storage as entries arrive, so any non-zero capacity is accepted.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        tracing::debug!(capacity = capacity.get(), "creating lru cache");
        Self {
            map: LinkedHashMap::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Gets a value from the cache, marking it as most recently used.
    ///
    /// A missing key returns `None` and leaves the cache unchanged.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).map(|v| &*v)
    }

    /// Gets a mutable reference to a value, marking it as most recently used.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.map.get_ptr(key)?;
        self.map.move_to_head(ptr);
        Some(self.map.ptr_get_mut(ptr))
    }

    /// Inserts or updates `key`, marking it as most recently used.
    ///
    /// Updating an existing key never evicts. Inserting a new key into a full
    /// cache evicts exactly one entry, the least recently used one.
    pub fn put(&mut self, key: K, value: V) {
        self.push(key, value);
    }

    /// Same as [`put`](Self::put), but returns the entry evicted to make
    /// room, if any.
    ///
    /// ```
    /// use lru_slab::LruCache;
    ///
    /// let mut cache = LruCache::new(1)?;
    /// assert_eq!(cache.push(1, "one"), None);
    /// assert_eq!(cache.push(1, "uno"), None);
    /// assert_eq!(cache.push(2, "two"), Some((1, "uno")));
    /// # Ok::<(), lru_slab::Error>(())
    /// ```
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.map.insert_head(key, value).is_some() {
            return None;
        }
        if self.map.len() <= self.capacity.get() {
            return None;
        }

        let evicted = self.map.remove_tail();
        debug_assert!(evicted.is_some(), "Over capacity with nothing to evict");
        tracing::trace!(
            len = self.map.len(),
            capacity = self.capacity.get(),
            "evicted least recently used entry"
        );
        evicted
    }

    /// Returns a reference to the value without touching it.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_ptr(key).map(|ptr| self.map.ptr_get(ptr))
    }

    /// Returns true if the cache contains `key`, without touching it.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_ptr(key).is_some()
    }

    /// Returns the entry that the next eviction would remove.
    ///
    /// ```
    /// use lru_slab::LruCache;
    ///
    /// let mut cache = LruCache::new(3)?;
    /// cache.put("a", 1);
    /// cache.put("b", 2);
    /// cache.get("a");
    ///
    /// assert_eq!(cache.peek_lru(), Some((&"b", &2)));
    /// assert_eq!(cache.peek_mru(), Some((&"a", &1)));
    /// # Ok::<(), lru_slab::Error>(())
    /// ```
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.map.tail_ptr().map(|ptr| self.map.ptr_get_entry(ptr))
    }

    /// Returns the most recently used entry.
    pub fn peek_mru(&self) -> Option<(&K, &V)> {
        self.map.head_ptr().map(|ptr| self.map.ptr_get_entry(ptr))
    }

    /// Validates the cache's internal state, panicking on any inconsistency.
    /// This is **expensive** and only meant for debugging.
    #[doc(hidden)]
    #[cfg(any(test, feature = "internal-debugging"))]
    pub fn debug_validate(&self) {
        assert!(
            self.map.len() <= self.capacity.get(),
            "Cache holds {} entries over a capacity of {}",
            self.map.len(),
            self.capacity
        );
        self.map.debug_validate();
    }
}

impl<K, V> LruCache<K, V> {
    /// Returns the number of entries currently in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }

    /// Returns the maximum number of entries the cache can hold.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns an iterator over entries from most to least recently used.
    ///
    /// Iteration does not touch any entry. Use `.rev()` to walk in eviction
    /// order.
    ///
    /// ```
    /// use lru_slab::LruCache;
    ///
    /// let mut cache = LruCache::new(3)?;
    /// cache.put("a", 1);
    /// cache.put("b", 2);
    /// cache.put("c", 3);
    /// cache.get("a");
    ///
    /// let keys: Vec<_> = cache.iter().map(|(k, _)| *k).collect();
    /// assert_eq!(keys, ["a", "c", "b"]);
    ///
    /// let eviction_order: Vec<_> = cache.iter().rev().map(|(k, _)| *k).collect();
    /// assert_eq!(eviction_order, ["b", "c", "a"]);
    /// # Ok::<(), lru_slab::Error>(())
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter()
    }

    /// Returns an iterator over the keys, most recently used first.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
        self.map.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over the values, most recently used first.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.map.iter().map(|(_, v)| v)
    }
}

impl<K, V> IntoIterator for LruCache<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    /// Consumes the cache, yielding entries from most to least recently used.
    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for LruCache<K, V> {
    /// Puts each pair in order, evicting as needed.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_new_rejects_zero() {
        assert_eq!(
            LruCache::<i32, i32>::new(0).unwrap_err(),
            Error::zero_capacity()
        );
        assert_eq!(LruCache::<i32, i32>::new(1).unwrap().capacity(), 1);
    }

    #[test]
    fn test_lru_trivial() {
        let mut lru = LruCache::new(3).unwrap();
        lru.put("a", 1);
        lru.put("b", 2);
        lru.put("c", 3);

        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"b"), Some(&2));
        assert_eq!(lru.get(&"c"), Some(&3));

        lru.get(&"a");
        lru.put("d", 4);

        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"b"), None);
        lru.debug_validate();
    }

    #[test]
    fn test_push_reports_only_evictions() {
        let mut lru = LruCache::new(2).unwrap();
        assert_eq!(lru.push(1, 'a'), None);
        assert_eq!(lru.push(2, 'b'), None);
        assert_eq!(lru.push(1, 'A'), None);
        assert_eq!(lru.push(3, 'c'), Some((2, 'b')));
        assert_eq!(lru.push(4, 'd'), Some((1, 'A')));
        assert_eq!(lru.len(), 2);
        lru.debug_validate();
    }

    #[test]
    fn test_capacity_one() {
        let mut lru = LruCache::new(1).unwrap();
        lru.put(1, 1);
        lru.put(2, 2);
        assert_eq!(lru.get(&1), None);
        assert_eq!(lru.get(&2), Some(&2));
        lru.put(2, 20);
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.peek(&2), Some(&20));
        lru.debug_validate();
    }

    #[test]
    fn test_peek_does_not_touch() {
        let mut lru = LruCache::new(2).unwrap();
        lru.put(1, ());
        lru.put(2, ());
        assert_eq!(lru.peek(&1), Some(&()));
        assert!(lru.contains_key(&1));
        assert_eq!(lru.peek_lru(), Some((&1, &())));

        lru.put(3, ());
        assert!(!lru.contains_key(&1));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut lru = LruCache::new(2).unwrap();
        lru.put(1, "one".to_string());
        lru.put(2, "two".to_string());

        let mut cloned = lru.clone();
        cloned.get(&1);
        cloned.put(3, "three".to_string());

        assert_eq!(cloned.keys().copied().collect::<Vec<_>>(), [3, 1]);
        assert_eq!(lru.keys().copied().collect::<Vec<_>>(), [2, 1]);
        cloned.debug_validate();
        lru.debug_validate();
    }

    #[test]
    fn test_debug_output() {
        let mut lru = LruCache::new(2).unwrap();
        lru.put(1, 'a');
        let debug = format!("{lru:?}");
        assert!(debug.starts_with("LruCache { capacity: 2"), "{debug}");
        assert!(debug.contains("entries: [(1, 'a')]"), "{debug}");
    }

    #[derive(Clone, Debug)]
    enum Op {
        Put(u8, u16),
        Get(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..16u8, any::<u16>()).prop_map(|(k, v)| Op::Put(k, v)),
            (0..16u8).prop_map(Op::Get),
        ]
    }

    fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(op_strategy(), 0..200)
    }

    /// Reference model: most recently used at the front.
    #[derive(Default)]
    struct Model {
        entries: VecDeque<(u8, u16)>,
    }

    impl Model {
        fn touch(&mut self, key: u8) -> Option<u16> {
            let index = self.entries.iter().position(|(k, _)| *k == key)?;
            let entry = self.entries.remove(index)?;
            self.entries.push_front(entry);
            Some(entry.1)
        }

        fn put(&mut self, key: u8, value: u16, capacity: usize) {
            if self.touch(key).is_some() {
                self.entries[0].1 = value;
                return;
            }
            self.entries.push_front((key, value));
            if self.entries.len() > capacity {
                self.entries.pop_back();
            }
        }
    }

    fn snapshot(cache: &LruCache<u8, u16>) -> Vec<(u8, u16)> {
        cache.iter().map(|(k, v)| (*k, *v)).collect()
    }

    proptest! {
        /// len() never exceeds capacity, and the structure stays consistent
        #[test]
        fn prop_len_never_exceeds_capacity(capacity in 1..8usize, ops in ops_strategy()) {
            let mut cache = LruCache::new(capacity).unwrap();
            for op in ops {
                match op {
                    Op::Put(k, v) => cache.put(k, v),
                    Op::Get(k) => {
                        cache.get(&k);
                    }
                }
                prop_assert!(cache.len() <= cache.capacity());
                cache.debug_validate();
            }
        }

        /// The cache matches a naive recency list after every operation
        #[test]
        fn prop_matches_model(capacity in 1..8usize, ops in ops_strategy()) {
            let mut cache = LruCache::new(capacity).unwrap();
            let mut model = Model::default();
            for op in ops {
                match op {
                    Op::Put(k, v) => {
                        cache.put(k, v);
                        model.put(k, v, capacity);
                    }
                    Op::Get(k) => {
                        prop_assert_eq!(cache.get(&k).copied(), model.touch(k));
                    }
                }
                let expected: Vec<_> = model.entries.iter().copied().collect();
                prop_assert_eq!(snapshot(&cache), expected);
            }
        }

        /// Repeated gets return the same value and leave the eviction order alone
        #[test]
        fn prop_repeated_get_is_stable(capacity in 1..8usize, ops in ops_strategy(), key in 0..16u8) {
            let mut cache = LruCache::new(capacity).unwrap();
            for op in ops {
                if let Op::Put(k, v) = op {
                    cache.put(k, v);
                }
            }
            let first = cache.get(&key).copied();
            let order = snapshot(&cache);
            let second = cache.get(&key).copied();
            prop_assert_eq!(first, second);
            prop_assert_eq!(snapshot(&cache), order);
        }

        /// A touched key survives exactly capacity - 1 new inserts
        #[test]
        fn prop_touched_key_evicted_after_capacity_inserts(
            capacity in 1..8usize,
            ops in ops_strategy(),
            key in 0..16u8,
            via_get in any::<bool>(),
        ) {
            let mut cache = LruCache::new(capacity).unwrap();
            for op in ops {
                if let Op::Put(k, v) = op {
                    cache.put(k, v);
                }
            }
            if via_get && cache.contains_key(&key) {
                cache.get(&key);
            } else {
                cache.put(key, 0);
            }

            for (n, fresh) in (100..100 + capacity as u8).enumerate() {
                cache.put(fresh, 1);
                if n + 1 < capacity {
                    prop_assert!(cache.contains_key(&key));
                } else {
                    prop_assert!(!cache.contains_key(&key));
                }
            }
        }

        /// Re-putting a key moves only that key to the front
        #[test]
        fn prop_reput_moves_only_that_key(capacity in 1..8usize, ops in ops_strategy(), key in 0..16u8) {
            let mut cache = LruCache::new(capacity).unwrap();
            for op in ops {
                if let Op::Put(k, v) = op {
                    cache.put(k, v);
                }
            }
            let Some(value) = cache.peek(&key).copied() else {
                return Ok(());
            };

            let mut expected: Vec<_> = snapshot(&cache)
                .into_iter()
                .filter(|(k, _)| *k != key)
                .collect();
            expected.insert(0, (key, value));

            cache.put(key, value);
            prop_assert_eq!(snapshot(&cache), expected);
        }
    }
}
