//! Versioned entity graph store for Arbor.
//!
//! This crate provides:
//! - [`EntityTypeRegistry`] - Entity type layouts and declared connections
//! - [`ImmutableEntityStorage`] - Frozen snapshots, cheap to clone and share
//! - [`MutableEntityStorage`] - Single-writer builder with cascade rules
//! - [`EntityStorage`] - Read access common to both
//! - [`VersionedStorageChange`] - What a builder session changed
//! - [`ExternalEntityMapping`] - User data attached to entities
//! - [`EntityPointer`] / [`EntityReference`] - Storage-independent handles
//! - [`StorageDump`] - Process-independent export of a snapshot
//!
//! Builders reconcile with each other through
//! [`MutableEntityStorage::apply_changes_from`] and
//! [`MutableEntityStorage::replace_by_source`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod apply;
mod barrel;
pub mod builder;
pub mod changes;
mod collapse;
pub mod config;
mod consistency;
pub mod dump;
pub mod entity;
pub mod external;
mod indexes;
mod journal;
pub mod pointer;
mod refs;
pub mod registry;
mod replace;
pub mod snapshot;
pub mod storage;

#[cfg(test)]
mod testing;

pub use builder::MutableEntityStorage;
pub use changes::{ChangedEntity, EntityChange, VersionedStorageChange};
pub use config::{StoreConfig, SymbolicIdConflict};
pub use dump::{ConnectionRecord, DumpValue, EdgeRecord, EntityRecord, StorageDump, TypeRecord};
pub use entity::{ChildSpec, Entity, EntityData, EntityView, ModifiableEntity, NewEntity};
pub use external::{ExternalEntityMapping, MappingData, MutableExternalEntityMapping};
pub use pointer::{EntityPointer, EntityReference};
pub use registry::{EntityTypeRegistry, EntityTypeSchema, FieldSchema};
pub use snapshot::{ImmutableEntityStorage, StorageVersion};
pub use storage::EntityStorage;
