//! Entity identifiers, type tags, and storage lineages.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interned entity type tag.
///
/// Class ids are small integers handed out by the process-wide identity
/// table (see [`crate::intern`]). They are only meaningful within one
/// process; serialized data refers to types by name.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// Wraps a raw index without interning.
    ///
    /// Only useful for tests and for decoding ids that were produced by
    /// [`ClassId::index`] in the same process.
    #[must_use]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this class.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Entity identifier: type tag plus a sequence number local to that type.
///
/// # Layout
/// - `class`: the entity type
/// - `index`: slot in the type's entity family, always below `i32::MAX`
///   so it can key the packed int containers
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId {
    /// Entity type.
    pub class: ClassId,
    /// Slot within the entity family.
    pub index: u32,
}

impl EntityId {
    /// Creates a new entity id.
    #[must_use]
    pub const fn new(class: ClassId, index: u32) -> Self {
        Self { class, index }
    }

    /// Rebuilds an id from a packed container key.
    ///
    /// # Panics
    ///
    /// Panics if `key` is negative. Container keys are never negative.
    #[must_use]
    pub fn from_key(class: ClassId, key: i32) -> Self {
        let index = u32::try_from(key).expect("container keys are non-negative");
        Self { class, index }
    }

    /// Returns the index as a key for the int-keyed containers.
    ///
    /// # Panics
    ///
    /// Panics if the index does not fit a non-negative `i32`; entity
    /// families never allocate that far.
    #[must_use]
    pub fn key(self) -> i32 {
        i32::try_from(self.index).expect("entity index exceeds container key range")
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}:{})", self.class.0, self.index)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}:{})", self.class.0, self.index)
    }
}

static NEXT_LINEAGE: AtomicU64 = AtomicU64::new(1);

/// Family of storages derived from one another.
///
/// A fresh lineage is allocated by every `create()`; snapshots and builders
/// derived from an existing storage inherit its lineage. Entity handles are
/// only comparable within a lineage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Lineage(u64);

impl Lineage {
    /// Allocates a new, never before seen lineage.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_LINEAGE.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw lineage number.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lineage({})", self.0)
    }
}
