//! Change stream: what a builder session did, per entity type.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_foundation::{ClassId, EntityId, EntitySource, Value};

use crate::entity::{Entity, EntityData};
use crate::journal::{ChangeEntry, ChangeLog};
use crate::snapshot::StorageVersion;

/// Entity data captured in a change.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangedEntity {
    /// Handle of the entity in the builder's lineage.
    pub entity: Entity,
    /// Data at the time described by the change.
    pub data: Arc<EntityData>,
}

impl ChangedEntity {
    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    /// Entity source.
    #[must_use]
    pub fn source(&self) -> &EntitySource {
        self.data.source()
    }

    /// Field values in schema order.
    #[must_use]
    pub fn fields(&self) -> &[Value] {
        self.data.fields()
    }
}

/// One change of one entity.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityChange {
    /// The entity was created.
    Added(ChangedEntity),
    /// The entity was removed.
    Removed(ChangedEntity),
    /// Data, source, or edges of the entity changed.
    Replaced {
        /// State before the session.
        old: ChangedEntity,
        /// State after the session.
        new: ChangedEntity,
    },
}

impl EntityChange {
    /// Handle of the changed entity.
    #[must_use]
    pub fn entity(&self) -> Entity {
        match self {
            Self::Added(e) | Self::Removed(e) | Self::Replaced { new: e, .. } => e.entity,
        }
    }

    /// Class of the changed entity.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.entity().class()
    }

    /// Returns true for `Added`.
    #[must_use]
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }

    /// Returns true for `Removed`.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    /// Returns true for `Replaced`.
    #[must_use]
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }

    /// Data before the change, absent for `Added`.
    #[must_use]
    pub fn old_data(&self) -> Option<&Arc<EntityData>> {
        match self {
            Self::Added(_) => None,
            Self::Removed(e) | Self::Replaced { old: e, .. } => Some(&e.data),
        }
    }

    /// Data after the change, absent for `Removed`.
    #[must_use]
    pub fn new_data(&self) -> Option<&Arc<EntityData>> {
        match self {
            Self::Removed(_) => None,
            Self::Added(e) | Self::Replaced { new: e, .. } => Some(&e.data),
        }
    }

    fn order_rank(&self) -> u8 {
        match self {
            Self::Removed(_) => 0,
            Self::Replaced { .. } => 1,
            Self::Added(_) => 2,
        }
    }
}

/// Immutable description of the changes of one builder session.
///
/// Changes are grouped per entity type with no order inside a group;
/// [`VersionedStorageChange::ordered_changes`] gives the
/// remove, replace, add order for consumers that need one.
#[derive(Clone, Debug, Default)]
pub struct VersionedStorageChange {
    base: Option<StorageVersion>,
    changes: HashMap<ClassId, Vec<EntityChange>>,
}

impl VersionedStorageChange {
    pub(crate) fn from_log(
        log: &ChangeLog,
        base: Option<StorageVersion>,
        handle: impl Fn(EntityId) -> Entity,
    ) -> Self {
        let mut changes: HashMap<ClassId, Vec<EntityChange>> = HashMap::new();
        for (id, entry) in log.ordered() {
            let entity = handle(id);
            let change = match entry {
                ChangeEntry::Add { data } => EntityChange::Added(ChangedEntity {
                    entity,
                    data: data.clone(),
                }),
                ChangeEntry::Remove { old } => EntityChange::Removed(ChangedEntity {
                    entity,
                    data: old.clone(),
                }),
                ChangeEntry::Replace(entry) => EntityChange::Replaced {
                    old: ChangedEntity {
                        entity,
                        data: entry.old.clone(),
                    },
                    new: ChangedEntity {
                        entity,
                        data: entry.new.clone(),
                    },
                },
            };
            changes.entry(id.class).or_default().push(change);
        }
        Self { base, changes }
    }

    /// Snapshot the session started from, if any.
    #[must_use]
    pub fn base(&self) -> Option<StorageVersion> {
        self.base
    }

    /// Changes of one entity type.
    #[must_use]
    pub fn changes_of(&self, class: ClassId) -> &[EntityChange] {
        self.changes.get(&class).map_or(&[], Vec::as_slice)
    }

    /// Entity types with at least one change.
    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.changes.keys().copied()
    }

    /// All changes, flattened.
    pub fn iter(&self) -> impl Iterator<Item = &EntityChange> {
        self.changes.values().flatten()
    }

    /// All changes, removals first, then replacements, then additions.
    #[must_use]
    pub fn ordered_changes(&self) -> Vec<&EntityChange> {
        let mut all: Vec<&EntityChange> = self.iter().collect();
        all.sort_by_key(|c| c.order_rank());
        all
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.values().map(Vec::len).sum()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of `Added` changes.
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.iter().filter(|c| c.is_added()).count()
    }

    /// Number of `Removed` changes.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.iter().filter(|c| c.is_removed()).count()
    }

    /// Number of `Replaced` changes.
    #[must_use]
    pub fn replaced_count(&self) -> usize {
        self.iter().filter(|c| c.is_replaced()).count()
    }
}
