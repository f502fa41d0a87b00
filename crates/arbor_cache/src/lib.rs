//! Cache files for Arbor storage snapshots.
//!
//! This crate provides:
//! - [`serialize_cache`] / [`deserialize_cache`] - Snapshot files in `MessagePack` format
//! - [`to_bytes`] / [`from_bytes`] - The same encoding without file I/O
//! - [`TypeResolver`] - Maps cached type names back to registered classes
//!
//! A loaded cache comes back as a [`arbor_storage::MutableEntityStorage`]
//! of a new lineage with an empty change journal.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod resolver;
pub mod serialize;

pub use resolver::{RegistryTypeResolver, TypeResolver};
pub use serialize::{
    SERIALIZER_VERSION, SerializationResult, deserialize_cache, from_bytes, serialize_cache, to_bytes,
};
