use std::{
    borrow::Borrow,
    fmt::Debug,
    hash::{
        BuildHasher,
        Hash,
    },
    iter::FusedIterator,
};

use hashbrown::{
    HashTable,
    hash_table,
};
use slab::Slab;

use crate::RandomState;

/// Handle to a node slot in the arena.
///
/// Slots 0 and 1 always hold the head and tail sentinels. Every other handle
/// addresses a live entry for as long as it is stored in the index.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct Ptr(usize);

impl Debug for Ptr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Ptr::HEAD => write!(f, "Ptr(head)"),
            Ptr::TAIL => write!(f, "Ptr(tail)"),
            Ptr(index) => write!(f, "Ptr({index})"),
        }
    }
}

impl Ptr {
    pub(crate) const HEAD: Ptr = Ptr(0);
    pub(crate) const TAIL: Ptr = Ptr(1);

    pub(crate) fn is_sentinel(self) -> bool {
        self == Ptr::HEAD || self == Ptr::TAIL
    }

    fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct LLData<K, T> {
    hash: u64,
    key: K,
    value: T,
}

#[derive(Debug, Clone)]
enum NodeData<K, T> {
    Sentinel,
    Data(LLData<K, T>),
}

#[derive(Debug, Clone)]
struct LLNode<K, T> {
    prev: Ptr,
    next: Ptr,
    data: NodeData<K, T>,
}

impl<K, T> LLNode<K, T> {
    fn sentinel() -> Self {
        LLNode {
            prev: Ptr::HEAD,
            next: Ptr::TAIL,
            data: NodeData::Sentinel,
        }
    }

    fn data(&self) -> &LLData<K, T> {
        match &self.data {
            NodeData::Data(data) => data,
            NodeData::Sentinel => unreachable!("Attempted to access data of a sentinel node"),
        }
    }

    fn data_mut(&mut self) -> &mut LLData<K, T> {
        match &mut self.data {
            NodeData::Data(data) => data,
            NodeData::Sentinel => unreachable!("Attempted to access data of a sentinel node"),
        }
    }

    fn into_data(self) -> LLData<K, T> {
        match self.data {
            NodeData::Data(data) => data,
            NodeData::Sentinel => unreachable!("Attempted to extract data from a sentinel node"),
        }
    }
}

/// A hash map whose entries are also threaded on a doubly-linked list, most
/// recently touched first.
#[derive(Clone)]
pub(crate) struct LinkedHashMap<K, T> {
    nodes: Slab<LLNode<K, T>>,
    table: HashTable<Ptr>,
    hasher: RandomState,
}

impl<K: Debug, T: Debug> Debug for LinkedHashMap<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedHashMap")
            .field("len", &self.len())
            .field("head", &self.head_ptr().map(|ptr| self.ptr_get_entry(ptr).0))
            .field("tail", &self.tail_ptr().map(|ptr| self.ptr_get_entry(ptr).0))
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

/// Upper bound on the entries reserved up front. Larger maps grow on demand.
const MAX_PREALLOCATED: usize = 1 << 12;

impl<K, T> LinkedHashMap<K, T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_PREALLOCATED);
        let mut nodes = Slab::with_capacity(capacity + 2);
        let head = nodes.insert(LLNode::sentinel());
        let tail = nodes.insert(LLNode::sentinel());
        debug_assert_eq!((Ptr(head), Ptr(tail)), (Ptr::HEAD, Ptr::TAIL));

        LinkedHashMap {
            nodes,
            table: HashTable::with_capacity(capacity),
            hasher: RandomState::default(),
        }
    }

    fn hash_key<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        BuildHasher::hash_one(&self.hasher, key)
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    /// The most recently touched entry.
    pub(crate) fn head_ptr(&self) -> Option<Ptr> {
        let ptr = self.nodes[Ptr::HEAD.index()].next;
        if ptr == Ptr::TAIL { None } else { Some(ptr) }
    }

    /// The least recently touched entry, i.e. the next one to evict.
    pub(crate) fn tail_ptr(&self) -> Option<Ptr> {
        let ptr = self.nodes[Ptr::TAIL.index()].prev;
        if ptr == Ptr::HEAD { None } else { Some(ptr) }
    }

    pub(crate) fn ptr_get(&self, ptr: Ptr) -> &T {
        &self.nodes[ptr.index()].data().value
    }

    pub(crate) fn ptr_get_mut(&mut self, ptr: Ptr) -> &mut T {
        &mut self.nodes[ptr.index()].data_mut().value
    }

    pub(crate) fn ptr_get_entry(&self, ptr: Ptr) -> (&K, &T) {
        let data = self.nodes[ptr.index()].data();
        (&data.key, &data.value)
    }

    pub(crate) fn move_to_head(&mut self, ptr: Ptr) {
        if self.nodes[Ptr::HEAD.index()].next == ptr {
            return;
        }
        self.unlink(ptr);
        self.link_after_head(ptr);
    }

    fn unlink(&mut self, ptr: Ptr) {
        assert!(!ptr.is_sentinel(), "Cannot unlink sentinel {ptr:?}");
        let prev = self.nodes[ptr.index()].prev;
        let next = self.nodes[ptr.index()].next;
        assert_eq!(
            self.nodes[prev.index()].next,
            ptr,
            "Broken forward link into {ptr:?} from {prev:?}"
        );
        assert_eq!(
            self.nodes[next.index()].prev,
            ptr,
            "Broken back link into {ptr:?} from {next:?}"
        );

        self.nodes[prev.index()].next = next;
        self.nodes[next.index()].prev = prev;
    }

    fn link_after_head(&mut self, ptr: Ptr) {
        let first = self.nodes[Ptr::HEAD.index()].next;

        let node = &mut self.nodes[ptr.index()];
        node.prev = Ptr::HEAD;
        node.next = first;

        self.nodes[first.index()].prev = ptr;
        self.nodes[Ptr::HEAD.index()].next = ptr;
    }

    /// Unlinks and frees the least recently touched entry.
    pub(crate) fn remove_tail(&mut self) -> Option<(K, T)> {
        let ptr = self.tail_ptr()?;
        self.unlink(ptr);

        let data = self.nodes.remove(ptr.index()).into_data();
        match self.table.find_entry(data.hash, |candidate| *candidate == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => unreachable!("Pointer not found in table: {ptr:?}"),
        }

        Some((data.key, data.value))
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, T> {
        Iter {
            nodes: &self.nodes,
            front: self.nodes[Ptr::HEAD.index()].next,
            back: self.nodes[Ptr::TAIL.index()].prev,
            remaining: self.len(),
        }
    }

    pub(crate) fn into_iter(self) -> IntoIter<K, T> {
        IntoIter {
            front: self.nodes[Ptr::HEAD.index()].next,
            back: self.nodes[Ptr::TAIL.index()].prev,
            remaining: self.table.len(),
            nodes: self.nodes,
        }
    }
}

impl<K: Hash + Eq, T> LinkedHashMap<K, T> {
    pub(crate) fn get_ptr<Q>(&self, key: &Q) -> Option<Ptr>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        self.table
            .find(hash, |ptr| {
                <K as Borrow<Q>>::borrow(&self.nodes[ptr.index()].data().key) == key
            })
            .copied()
    }

    /// Inserts or updates `key`, leaving it as the most recently touched
    /// entry. Returns the previous value when the key was already present.
    pub(crate) fn insert_head(&mut self, key: K, value: T) -> Option<T> {
        let hash = self.hash_key(&key);
        match self.table.entry(
            hash,
            |ptr| self.nodes[ptr.index()].data().key == key,
            |ptr| self.nodes[ptr.index()].data().hash,
        ) {
            hash_table::Entry::Occupied(occupied) => {
                let ptr = *occupied.get();
                let old = std::mem::replace(&mut self.nodes[ptr.index()].data_mut().value, value);
                self.move_to_head(ptr);
                Some(old)
            }
            hash_table::Entry::Vacant(vacant) => {
                let ptr = Ptr(self.nodes.insert(LLNode {
                    prev: Ptr::HEAD,
                    next: Ptr::TAIL,
                    data: NodeData::Data(LLData { hash, key, value }),
                }));
                vacant.insert(ptr);
                self.link_after_head(ptr);
                None
            }
        }
    }

    /// Walks the whole structure and panics if the index and the recency list
    /// disagree in any way. This is **expensive**.
    #[cfg(any(test, feature = "internal-debugging"))]
    pub(crate) fn debug_validate(&self) {
        assert!(
            matches!(self.nodes[Ptr::HEAD.index()].data, NodeData::Sentinel),
            "Head slot does not hold a sentinel"
        );
        assert!(
            matches!(self.nodes[Ptr::TAIL.index()].data, NodeData::Sentinel),
            "Tail slot does not hold a sentinel"
        );
        assert_eq!(
            self.nodes.len(),
            self.table.len() + 2,
            "Arena and index disagree on the number of entries"
        );

        let mut prev = Ptr::HEAD;
        let mut ptr = self.nodes[Ptr::HEAD.index()].next;
        let mut walked = 0;
        while ptr != Ptr::TAIL {
            assert!(
                walked < self.table.len(),
                "Recency list is longer than the index"
            );
            let node = &self.nodes[ptr.index()];
            assert_eq!(node.prev, prev, "Back link of {ptr:?} is broken");

            let data = node.data();
            assert_eq!(
                self.hash_key(&data.key),
                data.hash,
                "Stale hash cached for {ptr:?}"
            );
            assert_eq!(
                self.get_ptr(&data.key),
                Some(ptr),
                "Index does not resolve {ptr:?}"
            );

            prev = ptr;
            ptr = node.next;
            walked += 1;
        }

        assert_eq!(
            self.nodes[Ptr::TAIL.index()].prev,
            prev,
            "Tail sentinel back link is broken"
        );
        assert_eq!(walked, self.table.len(), "Index holds orphaned entries");
    }
}

/// Borrowing iterator over cache entries, most recently used first.
///
/// Created by [`LruCache::iter`](crate::LruCache::iter). Iterating in reverse
/// yields entries in eviction order.
pub struct Iter<'a, K, T> {
    nodes: &'a Slab<LLNode<K, T>>,
    front: Ptr,
    back: Ptr,
    remaining: usize,
}

impl<'a, K, T> Iterator for Iter<'a, K, T> {
    type Item = (&'a K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.front.index()];
        self.front = node.next;
        self.remaining -= 1;

        let data = node.data();
        Some((&data.key, &data.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, T> DoubleEndedIterator for Iter<'_, K, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.back.index()];
        self.back = node.prev;
        self.remaining -= 1;

        let data = node.data();
        Some((&data.key, &data.value))
    }
}

impl<K, T> ExactSizeIterator for Iter<'_, K, T> {}

impl<K, T> FusedIterator for Iter<'_, K, T> {}

impl<K, T> Clone for Iter<'_, K, T> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<K: Debug, T: Debug> Debug for Iter<'_, K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Owning iterator over cache entries, most recently used first.
///
/// Created by the [`IntoIterator`] impl of [`LruCache`](crate::LruCache).
pub struct IntoIter<K, T> {
    nodes: Slab<LLNode<K, T>>,
    front: Ptr,
    back: Ptr,
    remaining: usize,
}

impl<K, T> Iterator for IntoIter<K, T> {
    type Item = (K, T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.remove(self.front.index());
        self.front = node.next;
        self.remaining -= 1;

        let data = node.into_data();
        Some((data.key, data.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, T> DoubleEndedIterator for IntoIter<K, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.remove(self.back.index());
        self.back = node.prev;
        self.remaining -= 1;

        let data = node.into_data();
        Some((data.key, data.value))
    }
}

impl<K, T> ExactSizeIterator for IntoIter<K, T> {}

impl<K, T> FusedIterator for IntoIter<K, T> {}

impl<K: Clone, T: Clone> Clone for IntoIter<K, T> {
    fn clone(&self) -> Self {
        IntoIter {
            nodes: self.nodes.clone(),
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<K: Debug, T: Debug> Debug for IntoIter<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let remaining = Iter {
            nodes: &self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        };
        f.debug_list().entries(remaining).finish()
    }
}
