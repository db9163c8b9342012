#![no_main]

use fuzz_lib::{
    CacheOperation,
    Model,
};
use libfuzzer_sys::fuzz_target;
use lru_slab::LruCache;

fuzz_target!(|data: (u8, Vec<CacheOperation>)| {
    let (size, operations) = data;
    let capacity = (size % 16).max(1) as usize;

    let mut cache = LruCache::<u8, u8>::new(capacity).unwrap();
    let mut model = Model::default();

    for op in operations {
        match op {
            CacheOperation::Put(k, v) => {
                let contained_before = cache.contains_key(&k);
                let len_before = cache.len();
                cache.put(k, v);
                model.push(k, v, capacity);

                assert_eq!(cache.peek_mru(), Some((&k, &v)), "{cache:#?}");
                if contained_before || len_before < capacity {
                    assert_eq!(
                        cache.len(),
                        len_before + usize::from(!contained_before),
                        "{cache:#?}"
                    );
                } else {
                    assert_eq!(cache.len(), capacity, "{cache:#?}");
                }
            }
            CacheOperation::Push(k, v) => {
                let evicted = cache.push(k, v);
                assert_eq!(evicted, model.push(k, v, capacity), "{cache:#?}");
                if let Some((evicted_key, _)) = evicted {
                    assert!(!cache.contains_key(&evicted_key), "{cache:#?}");
                }
            }
            CacheOperation::Get(k) => {
                let order_before = cache.keys().copied().collect::<Vec<_>>();
                let result = cache.get(&k).copied();
                assert_eq!(result, model.touch(k).copied(), "{cache:#?}");
                if result.is_some() {
                    assert_eq!(cache.peek_mru().map(|(key, _)| *key), Some(k));
                } else {
                    assert_eq!(cache.keys().copied().collect::<Vec<_>>(), order_before);
                }
            }
            CacheOperation::GetMut(k, v) => {
                if let Some(value) = cache.get_mut(&k) {
                    *value = v;
                }
                if let Some(value) = model.touch(k) {
                    *value = v;
                }
            }
            CacheOperation::Peek(k) => {
                let order_before = cache.keys().copied().collect::<Vec<_>>();
                assert_eq!(cache.peek(&k).copied(), model.peek(k), "{cache:#?}");
                assert_eq!(cache.contains_key(&k), model.peek(k).is_some());
                assert_eq!(cache.keys().copied().collect::<Vec<_>>(), order_before);
            }
            CacheOperation::Iter => {
                assert_eq!(cache.iter().len(), cache.len());
                for (k, v) in cache.iter() {
                    assert_eq!(cache.peek(k), Some(v), "{cache:#?}");
                }
            }
        }

        let expected = model.entries.iter().copied().collect::<Vec<_>>();
        let actual = cache.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>();
        assert_eq!(actual, expected, "Recency order diverged: {cache:#?}");
        assert!(cache.len() <= cache.capacity(), "{cache:#?}");
    }

    cache.debug_validate();
    assert_eq!(cache.capacity(), capacity, "Cache capacity altered: {cache:#?}");
});
