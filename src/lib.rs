//! Arbor - Versioned, graph-structured entity store
//!
//! This crate re-exports all layers of the Arbor system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: arbor_cache      — MessagePack cache files for snapshots
//! Layer 1: arbor_storage    — Entity graph store, reconciliation, change stream
//! Layer 0: arbor_foundation — Ids, values, interning, packed containers, errors
//! ```

pub use arbor_cache as cache;
pub use arbor_foundation as foundation;
pub use arbor_storage as storage;
