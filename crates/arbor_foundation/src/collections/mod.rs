//! Copy-on-write containers used as the physical storage of edges and
//! indexes.
//!
//! Frozen containers have no mutation methods; writes go through a separate
//! builder type obtained with `to_builder()` and frozen again with
//! `build()`. Uniqueness-enforcing containers reject duplicate inserts with
//! `DuplicateKey` / `DuplicateValue` and stay unchanged.

mod bidirectional;
mod int_bimap;
mod int_map;
mod multimap;
pub mod packing;
mod persistent;

pub use bidirectional::{BidirectionalMap, BidirectionalMultiMap};
pub use int_bimap::{
    IntIntUniqueBiMap, IntIntUniqueBiMapBuilder, NonNegativeIntIntBiMap,
    NonNegativeIntIntBiMapBuilder,
};
pub use int_map::IntIntDefaultMap;
pub use multimap::{IntSequence, NonNegativeIntIntMultiMap, NonNegativeIntIntMultiMapBuilder};
pub use persistent::{PersistentBiMap, PersistentBiMapBuilder};
