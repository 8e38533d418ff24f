#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A HashMap built on the compacting mode of the chained HashTable.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers. The pairs
/// stay densely packed in contiguous storage, at the cost of one relocation
/// per removal.
pub mod hash_map;

pub mod hash_table;

/// A hash set built on the index-stable mode of the chained HashTable.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers. Removing a value
/// never moves any other value.
pub mod hash_set;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Default hasher builder used by [`HashMap`] and [`HashSet`],
        /// backed by `foldhash`.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Default hasher builder used by [`HashMap`] and [`HashSet`],
        /// backed by the standard library's `RandomState`.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Default hasher builder placeholder for builds without `std` or
        /// `foldhash`.
        ///
        /// No hasher is available in this configuration; construct maps and
        /// sets through their `with_hasher` constructors instead.
        pub enum DefaultHashBuilder {}
    }
}
