//! Frozen, shareable storage snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arbor_foundation::{Lineage, Result};

use crate::builder::MutableEntityStorage;
use crate::config::StoreConfig;
use crate::consistency;
use crate::refs::RefsTable;
use crate::registry::EntityTypeRegistry;
use crate::storage::{StorageCore, delegate_entity_storage};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Position of a snapshot in its lineage.
///
/// Numbers grow monotonically across the process, so within one lineage a
/// larger number is a later snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageVersion {
    lineage: Lineage,
    number: u64,
}

impl StorageVersion {
    pub(crate) fn next(lineage: Lineage) -> Self {
        Self {
            lineage,
            number: NEXT_VERSION.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Lineage of the snapshot.
    #[must_use]
    pub const fn lineage(self) -> Lineage {
        self.lineage
    }

    /// Version number.
    #[must_use]
    pub const fn number(self) -> u64 {
        self.number
    }

    /// Returns true if `self` is `other` or an earlier snapshot of the
    /// same lineage.
    #[must_use]
    pub fn precedes_or_equals(self, other: Self) -> bool {
        self.lineage == other.lineage && self.number <= other.number
    }
}

/// Immutable storage snapshot.
///
/// Snapshots share structure with the builders they were frozen from and
/// with each other. Cloning is O(1) and snapshots can be read from many
/// threads.
#[derive(Clone, Debug)]
pub struct ImmutableEntityStorage {
    pub(crate) core: StorageCore<RefsTable>,
    version: StorageVersion,
}

delegate_entity_storage!(ImmutableEntityStorage);

impl ImmutableEntityStorage {
    pub(crate) fn from_core(core: StorageCore<RefsTable>) -> Self {
        let version = StorageVersion::next(core.lineage);
        Self { core, version }
    }

    /// Empty snapshot of a new lineage.
    #[must_use]
    pub fn empty(registry: Arc<EntityTypeRegistry>) -> Self {
        MutableEntityStorage::create(registry).to_snapshot()
    }

    /// Version of the snapshot.
    #[must_use]
    pub fn version(&self) -> StorageVersion {
        self.version
    }

    /// Configuration inherited by builders.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.core.config
    }

    /// Shared registry handle.
    #[must_use]
    pub fn registry_arc(&self) -> &Arc<EntityTypeRegistry> {
        &self.core.registry
    }

    /// Starts a builder on top of this snapshot.
    #[must_use]
    pub fn to_builder(&self) -> MutableEntityStorage {
        MutableEntityStorage::from(self)
    }

    /// Checks every storage invariant.
    ///
    /// # Errors
    ///
    /// Returns `Inconsistent` describing each violation found.
    pub fn assert_consistency(&self) -> Result<()> {
        consistency::check(&self.core)
    }
}
