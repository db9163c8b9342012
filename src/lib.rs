#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

mod error;
mod linked_hashmap;
mod lru;

pub use error::{
    Error,
    Result,
};
pub use linked_hashmap::{
    IntoIter,
    Iter,
};
pub use lru::LruCache;

#[cfg(not(feature = "ahash"))]
type RandomState = std::hash::RandomState;
#[cfg(feature = "ahash")]
type RandomState = ahash::RandomState;
