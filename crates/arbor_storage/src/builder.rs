//! Writable storage builder.
//!
//! A builder starts from a snapshot (or from nothing), applies mutations
//! under the cascade rules, journals what it did, and freezes into new
//! snapshots. Every storage part is shared with the snapshot it came from
//! until the first write to that part.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arbor_foundation::{
    ConnectionId, EntityId, EntitySource, Error, ErrorKind, Lineage, Result, SymbolicEntityId,
};

use crate::barrel::EntitiesBarrel;
use crate::changes::VersionedStorageChange;
use crate::config::{StoreConfig, SymbolicIdConflict};
use crate::consistency;
use crate::entity::{
    ChildSpec, Entity, EntityData, EntityModification, ModifiableEntity, NewEntity, layout_fields,
};
use crate::external::{
    ExternalEntityMapping, ExternalMappings, MappingData, MutableExternalEntityMapping,
};
use crate::indexes::StorageIndexes;
use crate::journal::{ChangeLog, ReplaceEntry};
use crate::refs::{EdgeRead, MutableRefsTable, RefsTable};
use crate::registry::{EntityTypeRegistry, EntityTypeSchema};
use crate::snapshot::{ImmutableEntityStorage, StorageVersion};
use crate::storage::{EntityStorage, StorageCore, delegate_entity_storage};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Writable entity storage.
///
/// All mutations go through `&mut self`, so a builder has a single writer.
/// Reads are available through [`EntityStorage`].
#[derive(Debug)]
pub struct MutableEntityStorage {
    pub(crate) core: StorageCore<MutableRefsTable>,
    pub(crate) journal: ChangeLog,
    base: Option<StorageVersion>,
    pub(crate) origin: Origin,
    last_frozen: u64,
    // Set once this builder's journal has been applied to another builder.
    applied: AtomicBool,
    instance: u64,
    modification_count: u64,
}

delegate_entity_storage!(MutableEntityStorage);

/// Edges and mappings as they were when the journal was last empty.
#[derive(Clone, Debug)]
pub(crate) struct Origin {
    pub(crate) refs: RefsTable,
    pub(crate) mappings: Arc<ExternalMappings>,
}

/// A clone keeps the journal and identity of its original, so applying
/// one to the other is rejected.
impl Clone for MutableEntityStorage {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            journal: self.journal.clone(),
            base: self.base,
            origin: self.origin.clone(),
            last_frozen: self.last_frozen,
            applied: AtomicBool::new(self.applied.load(Ordering::Relaxed)),
            instance: self.instance,
            modification_count: self.modification_count,
        }
    }
}

impl From<&ImmutableEntityStorage> for MutableEntityStorage {
    fn from(snapshot: &ImmutableEntityStorage) -> Self {
        let core = &snapshot.core;
        Self::from_core(
            StorageCore {
                registry: Arc::clone(&core.registry),
                config: core.config.clone(),
                lineage: core.lineage,
                barrel: Arc::clone(&core.barrel),
                refs: core.refs.to_mutable(),
                indexes: Arc::clone(&core.indexes),
                mappings: Arc::clone(&core.mappings),
            },
            Some(snapshot.version()),
        )
    }
}

impl MutableEntityStorage {
    /// Creates an empty builder of a new lineage.
    #[must_use]
    pub fn create(registry: Arc<EntityTypeRegistry>) -> Self {
        Self::create_with_config(registry, StoreConfig::default())
    }

    /// Creates an empty builder of a new lineage with a configuration.
    #[must_use]
    pub fn create_with_config(registry: Arc<EntityTypeRegistry>, config: StoreConfig) -> Self {
        Self::from_core(
            StorageCore {
                registry,
                config,
                lineage: Lineage::fresh(),
                barrel: Arc::new(EntitiesBarrel::new()),
                refs: MutableRefsTable::new(),
                indexes: Arc::new(StorageIndexes::new()),
                mappings: Arc::new(ExternalMappings::default()),
            },
            None,
        )
    }

    pub(crate) fn from_core(
        mut core: StorageCore<MutableRefsTable>,
        base: Option<StorageVersion>,
    ) -> Self {
        let origin = Origin {
            refs: core.refs.freeze(),
            mappings: Arc::clone(&core.mappings),
        };
        Self {
            core,
            journal: ChangeLog::new(),
            base,
            origin,
            last_frozen: 0,
            applied: AtomicBool::new(false),
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            modification_count: 0,
        }
    }

    /// Configuration of the builder.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.core.config
    }

    /// Shared registry handle.
    #[must_use]
    pub fn registry_arc(&self) -> &Arc<EntityTypeRegistry> {
        &self.core.registry
    }

    /// Snapshot the builder was started from, if any.
    #[must_use]
    pub fn base_version(&self) -> Option<StorageVersion> {
        self.base
    }

    /// Number of mutation calls made on this builder.
    #[must_use]
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    /// Newest snapshot number this builder descends from or has produced.
    pub(crate) fn newest_version(&self) -> u64 {
        self.base
            .map_or(self.last_frozen, |base| base.number().max(self.last_frozen))
    }

    /// Marks the journal as applied to another builder.
    pub(crate) fn mark_applied(&self) {
        self.applied.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_applied(&self) -> bool {
        self.applied.load(Ordering::Relaxed)
    }

    pub(crate) fn handle(&self, id: EntityId) -> Entity {
        Entity::new(id, self.core.lineage)
    }

    pub(crate) fn bump_modification_count(&mut self) {
        self.modification_count += 1;
    }

    /// Runs `op`, restoring the entities, edges, mappings and journal it
    /// started from if it fails.
    pub(crate) fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let core = self.core.clone();
        let journal = self.journal.clone();
        let result = op(self);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "rolling back a failed mutation");
            self.core = core;
            self.journal = journal;
        }
        result
    }

    // =========================================================================
    // Adding
    // =========================================================================

    /// Adds an entity together with its attached subtree.
    ///
    /// The whole tree is validated before anything is stored.
    ///
    /// # Errors
    ///
    /// - `UnknownType`, `UnknownField`, `FieldTypeMismatch` for bad types
    ///   or field values anywhere in the tree
    /// - `InvalidConnection` for undeclared connections or ends that do not
    ///   fit them
    /// - `CardinalityViolation` for two children on a one-to-one connection
    /// - `MandatoryParentMissing` when an entity needs a parent it was not
    ///   given
    /// - `ForeignEntity` / `EntityNotFound` for bad parent or linked-child
    ///   handles
    /// - `SymbolicIdConflict` for clashing symbolic ids under
    ///   [`SymbolicIdConflict::Reject`], or inside the tree itself
    pub fn add_entity(&mut self, entity: NewEntity) -> Result<Entity> {
        let registry = Arc::clone(&self.core.registry);
        let mut claimed = Vec::new();
        self.validate_new(&registry, &entity, None, &mut claimed)
            .map_err(|err| err.in_operation("add_entity"))?;
        self.modification_count += 1;
        let id = self.create_tree(&registry, entity, None)?;
        Ok(self.handle(id))
    }

    fn validate_new(
        &self,
        registry: &EntityTypeRegistry,
        entity: &NewEntity,
        implied_parent: Option<ConnectionId>,
        claimed: &mut Vec<SymbolicEntityId>,
    ) -> Result<()> {
        let schema = schema_of(registry, entity.class)?;
        let fields = layout_fields(schema, &entity.fields)?;
        if let Some(symbolic) = schema.symbolic_id_of(&fields) {
            let taken = self.core.config.symbolic_id_conflict == SymbolicIdConflict::Reject
                && self.core.indexes.resolve(&symbolic).is_some();
            if taken || claimed.contains(&symbolic) {
                return Err(symbolic_conflict(&symbolic));
            }
            claimed.push(symbolic);
        }

        for (connection, parent) in &entity.parents {
            let parent = self.check_handle(*parent)?;
            if implied_parent == Some(*connection) {
                return Err(Error::invalid_connection(format!(
                    "new {} is given two parents on {}",
                    schema.name,
                    connection.debug_str()
                )));
            }
            check_fit(registry, *connection, parent.class, entity.class)?;
        }

        for connection in registry.connections_as_child(entity.class) {
            let supplied = implied_parent == Some(connection)
                || entity.parents.iter().any(|(c, _)| *c == connection);
            if !supplied && !connection.can_remove_parent() {
                return Err(Error::new(ErrorKind::MandatoryParentMissing {
                    child: format!("new {}", schema.name),
                    connection: connection.debug_str(),
                }));
            }
        }

        let mut one_to_one = HashSet::new();
        for (connection, child) in &entity.children {
            if connection.connection_type().is_one_to_one() && !one_to_one.insert(*connection) {
                return Err(Error::new(ErrorKind::CardinalityViolation(format!(
                    "new {} has several children on {}",
                    schema.name,
                    connection.debug_str()
                ))));
            }
            match child {
                ChildSpec::New(child) => {
                    check_fit(registry, *connection, entity.class, child.class)?;
                    self.validate_new(registry, child, Some(*connection), claimed)?;
                }
                ChildSpec::Linked(child) => {
                    let child = self.check_handle(*child)?;
                    check_fit(registry, *connection, entity.class, child.class)?;
                }
            }
        }
        Ok(())
    }

    fn create_tree(
        &mut self,
        registry: &EntityTypeRegistry,
        entity: NewEntity,
        parent: Option<(ConnectionId, EntityId)>,
    ) -> Result<EntityId> {
        let schema = schema_of(registry, entity.class)?;
        let fields = layout_fields(schema, &entity.fields)?;
        let id = self.insert_entity(schema, EntityData::new(entity.source, fields))?;
        if let Some((connection, parent)) = parent {
            self.attach(connection, parent, id)?;
        }
        for (connection, parent) in entity.parents {
            self.attach(connection, parent.id(), id)?;
        }
        for (connection, child) in entity.children {
            match child {
                ChildSpec::New(child) => {
                    self.create_tree(registry, child, Some((connection, id)))?;
                }
                ChildSpec::Linked(child) => self.attach(connection, id, child.id())?,
            }
        }
        Ok(id)
    }

    /// Stores and indexes a new entity without edges.
    pub(crate) fn insert_entity(
        &mut self,
        schema: &EntityTypeSchema,
        data: EntityData,
    ) -> Result<EntityId> {
        if let Some(symbolic) = schema.symbolic_id_of(data.fields()) {
            self.claim_symbolic_id(None, &symbolic)?;
        }
        let data = Arc::new(data);
        let id = Arc::make_mut(&mut self.core.barrel).add(schema.class, Arc::clone(&data))?;
        Arc::make_mut(&mut self.core.indexes).index(id, &data, schema);
        self.journal.record_add(id, data);
        Ok(id)
    }

    /// Makes `symbolic` available to `owner`, applying the conflict policy
    /// to any other holder.
    pub(crate) fn claim_symbolic_id(
        &mut self,
        owner: Option<EntityId>,
        symbolic: &SymbolicEntityId,
    ) -> Result<()> {
        let Some(holder) = self.core.indexes.resolve(symbolic) else {
            return Ok(());
        };
        if Some(holder) == owner {
            return Ok(());
        }
        match self.core.config.symbolic_id_conflict {
            SymbolicIdConflict::Reject => Err(symbolic_conflict(symbolic)),
            SymbolicIdConflict::Replace => {
                tracing::error!(
                    symbolic_id = %symbolic,
                    holder = ?holder,
                    "symbolic id already taken, removing the previous holder"
                );
                self.remove_cascade(holder);
                Ok(())
            }
        }
    }

    // =========================================================================
    // Modifying
    // =========================================================================

    /// Edits an entity through a [`ModifiableEntity`] and commits the
    /// result.
    ///
    /// If `edit` fails the storage is left untouched. Children dropped from
    /// a connection are detached when the connection allows it and removed
    /// otherwise. A changed symbolic id is rewritten in the fields of every
    /// entity that links to it.
    ///
    /// # Errors
    ///
    /// Returns `ForeignEntity` / `EntityNotFound` for a bad handle, whatever
    /// `edit` returns, and `SymbolicIdConflict` for a clashing symbolic id
    /// under [`SymbolicIdConflict::Reject`].
    pub fn modify_entity(
        &mut self,
        entity: Entity,
        edit: impl FnOnce(&mut ModifiableEntity<'_>) -> Result<()>,
    ) -> Result<Entity> {
        let id = self.check_handle(entity)?;
        let modification = {
            let view = self.entity(id).ok_or_else(|| Error::entity_not_found(id))?;
            let mut modifiable = ModifiableEntity::new(&view);
            edit(&mut modifiable)?;
            modifiable.into_modification()
        };
        self.modification_count += 1;
        self.commit(id, modification)
            .map_err(|err| err.in_operation("modify_entity"))?;
        Ok(entity)
    }

    fn commit(&mut self, id: EntityId, modification: EntityModification) -> Result<()> {
        let registry = Arc::clone(&self.core.registry);
        let schema = schema_of(&registry, id.class)?;
        let EntityModification {
            source,
            fields,
            children,
            parents,
        } = modification;
        let data = EntityData::new(source, fields);
        if self.core.config.symbolic_id_conflict == SymbolicIdConflict::Reject {
            if let Some(symbolic) = schema.symbolic_id_of(data.fields()) {
                if self.core.indexes.resolve(&symbolic).is_some_and(|holder| holder != id) {
                    return Err(symbolic_conflict(&symbolic));
                }
            }
        }
        self.update_data(id, schema, data)?;

        for (connection, wanted) in children {
            self.set_children(id, connection, &wanted)?;
        }
        for (connection, parent) in parents {
            if !self.core.barrel.contains(id) {
                break;
            }
            match parent {
                Some(parent) if self.core.barrel.contains(parent) => {
                    self.attach(connection, parent, id)?;
                }
                Some(_) => {}
                None => {
                    self.detach(connection, id);
                }
            }
        }
        Ok(())
    }

    /// Replaces the data of a live entity, keeping indexes, soft links, and
    /// the journal in step.
    pub(crate) fn update_data(
        &mut self,
        id: EntityId,
        schema: &EntityTypeSchema,
        data: EntityData,
    ) -> Result<()> {
        let old = self
            .core
            .barrel
            .get(id)
            .cloned()
            .ok_or_else(|| Error::entity_not_found(id))?;
        if *old == data {
            return Ok(());
        }
        let old_symbolic = schema.symbolic_id_of(old.fields());
        let new_symbolic = schema.symbolic_id_of(data.fields());
        if new_symbolic != old_symbolic {
            if let Some(symbolic) = &new_symbolic {
                self.claim_symbolic_id(Some(id), symbolic)?;
            }
        }
        let data = Arc::new(data);
        self.store_data(id, schema, Arc::clone(&data));
        self.journal.record_replace(id, ReplaceEntry::data(old, data));
        if let (Some(old_symbolic), Some(new_symbolic)) = (old_symbolic, new_symbolic) {
            if old_symbolic != new_symbolic {
                self.rewrite_soft_links(&old_symbolic, &new_symbolic);
            }
        }
        Ok(())
    }

    fn store_data(&mut self, id: EntityId, schema: &EntityTypeSchema, data: Arc<EntityData>) {
        Arc::make_mut(&mut self.core.indexes).reindex(id, &data, schema);
        Arc::make_mut(&mut self.core.barrel).replace(id, data);
    }

    fn rewrite_soft_links(&mut self, old: &SymbolicEntityId, new: &SymbolicEntityId) {
        let registry = Arc::clone(&self.core.registry);
        for referrer in self.core.indexes.referrers(old) {
            let Some(data) = self.core.barrel.get(referrer).cloned() else {
                continue;
            };
            let Some(schema) = registry.schema(referrer.class) else {
                continue;
            };
            let fields = data
                .fields()
                .iter()
                .map(|v| v.replace_symbolic(old, new).unwrap_or_else(|| v.clone()))
                .collect();
            let updated = Arc::new(data.with_fields(fields));
            self.store_data(referrer, schema, Arc::clone(&updated));

            // A referrer whose own symbolic id embeds the link moves too.
            let before = schema.symbolic_id_of(data.fields());
            let after = schema.symbolic_id_of(updated.fields());
            self.journal
                .record_replace(referrer, ReplaceEntry::data(data, updated));
            if let (Some(before), Some(after)) = (before, after) {
                if before != after {
                    self.rewrite_soft_links(&before, &after);
                }
            }
        }
    }

    /// Makes `wanted` the exact child list of `parent` on `connection`.
    pub(crate) fn set_children(
        &mut self,
        parent: EntityId,
        connection: ConnectionId,
        wanted: &[EntityId],
    ) -> Result<()> {
        let current = self.core.refs.children_of(connection, parent);
        let mut added = Vec::new();
        let mut removed = Vec::new();
        for child in &current {
            if !wanted.contains(child) {
                self.evict(connection, *child);
                removed.push(*child);
            }
        }
        for child in wanted {
            if !current.contains(child) && self.core.barrel.contains(*child) {
                self.attach(connection, parent, *child)?;
                added.push(*child);
            }
        }
        if let Some(data) = self.core.barrel.get(parent).cloned() {
            let mut entry = ReplaceEntry::edges(data);
            entry
                .removed_children
                .extend(removed.into_iter().map(|c| (connection, c)));
            entry
                .added_children
                .extend(added.into_iter().map(|c| (connection, c)));
            self.journal.record_replace(parent, entry);
        }
        Ok(())
    }

    /// Links `child` under `parent`, moving it from a previous parent and
    /// evicting the parent's current child on one-to-one connections.
    pub(crate) fn attach(
        &mut self,
        connection: ConnectionId,
        parent: EntityId,
        child: EntityId,
    ) -> Result<()> {
        if self.core.refs.parent_of(connection, child) == Some(parent) {
            return Ok(());
        }
        if connection.connection_type().is_one_to_one() {
            for existing in self.core.refs.children_of(connection, parent) {
                if existing != child {
                    self.evict(connection, existing);
                }
            }
        }
        self.core.refs.link(connection, parent, child)?;
        self.record_parent(child, connection, Some(parent));
        Ok(())
    }

    /// Clears the parent of `child` on `connection`. Returns false if it
    /// had none.
    pub(crate) fn detach(&mut self, connection: ConnectionId, child: EntityId) -> bool {
        if self.core.refs.unlink_child(connection, child).is_none() {
            return false;
        }
        self.record_parent(child, connection, None);
        true
    }

    /// Drops `child` from its parent: detached if it may live without one,
    /// removed otherwise.
    fn evict(&mut self, connection: ConnectionId, child: EntityId) {
        if connection.can_remove_parent() {
            self.detach(connection, child);
        } else {
            self.remove_cascade(child);
        }
    }

    fn record_parent(&mut self, child: EntityId, connection: ConnectionId, parent: Option<EntityId>) {
        if let Some(data) = self.core.barrel.get(child).cloned() {
            let mut entry = ReplaceEntry::edges(data);
            entry.parents.insert(connection, parent);
            self.journal.record_replace(child, entry);
        }
    }

    /// Replaces the source of one entity.
    ///
    /// # Errors
    ///
    /// Returns `ForeignEntity` or `EntityNotFound` for a bad handle.
    pub fn change_source(&mut self, entity: Entity, source: EntitySource) -> Result<Entity> {
        let id = self.check_handle(entity)?;
        let registry = Arc::clone(&self.core.registry);
        let schema = schema_of(&registry, id.class)?;
        let old = self
            .core
            .barrel
            .get(id)
            .cloned()
            .ok_or_else(|| Error::entity_not_found(id))?;
        self.modification_count += 1;
        self.update_data(id, schema, old.with_source(source))?;
        Ok(entity)
    }

    // =========================================================================
    // Removing
    // =========================================================================

    /// Removes an entity.
    ///
    /// Children held through connections that require a parent are removed
    /// with it, recursively; children that may live without a parent are
    /// detached and survive. Returns false if the entity is not live in this
    /// storage, including handles of another lineage.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        if entity.lineage() != self.core.lineage || !self.core.barrel.contains(entity.id()) {
            return false;
        }
        self.modification_count += 1;
        !self.remove_cascade(entity.id()).is_empty()
    }

    /// Removes `root` and everything that cannot outlive it. Returns the
    /// removed ids.
    pub(crate) fn remove_cascade(&mut self, root: EntityId) -> Vec<EntityId> {
        let registry = Arc::clone(&self.core.registry);
        let mut removed = Vec::new();
        let mut seen = HashSet::new();
        let mut detached = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.core.barrel.contains(id) || !seen.insert(id) {
                continue;
            }
            removed.push(id);
            for connection in registry.connections_as_parent(id.class) {
                for child in self.core.refs.children_of(connection, id) {
                    if connection.can_remove_parent() {
                        detached.push((connection, child));
                    } else {
                        stack.push(child);
                    }
                }
            }
        }

        for (connection, child) in detached {
            if !seen.contains(&child) {
                self.detach(connection, child);
            }
        }
        for id in &removed {
            self.drop_entity(&registry, *id);
        }
        tracing::trace!(root = ?root, removed = removed.len(), "removed entity");
        removed
    }

    fn drop_entity(&mut self, registry: &EntityTypeRegistry, id: EntityId) {
        for connection in registry.connections_as_parent(id.class) {
            self.core.refs.unlink_parent(connection, id);
        }
        for connection in registry.connections_as_child(id.class) {
            self.core.refs.unlink_child(connection, id);
        }
        Arc::make_mut(&mut self.core.indexes).unindex(id);
        if self.core.mappings.contains_entity(id) {
            Arc::make_mut(&mut self.core.mappings).remove_entity(id);
        }
        if let Some(old) = Arc::make_mut(&mut self.core.barrel).remove(id) {
            self.journal.record_remove(id, old);
        }
    }

    // =========================================================================
    // Journal & freezing
    // =========================================================================

    /// Net changes since the builder was created or last reset.
    #[must_use]
    pub fn collect_changes(&self) -> VersionedStorageChange {
        let lineage = self.core.lineage;
        VersionedStorageChange::from_log(&self.journal, self.base, |id| Entity::new(id, lineage))
    }

    /// Forgets the journal.
    pub fn reset_changes(&mut self) {
        self.journal.clear();
        *self.applied.get_mut() = false;
        self.origin = Origin {
            refs: self.core.refs.freeze(),
            mappings: Arc::clone(&self.core.mappings),
        };
    }

    /// Returns true if the journal holds any change.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.journal.is_empty()
    }

    /// Freezes the current state into a snapshot. The builder stays usable.
    #[must_use]
    pub fn to_snapshot(&mut self) -> ImmutableEntityStorage {
        let refs = self.core.refs.freeze();
        let snapshot = ImmutableEntityStorage::from_core(StorageCore {
            registry: Arc::clone(&self.core.registry),
            config: self.core.config.clone(),
            lineage: self.core.lineage,
            barrel: Arc::clone(&self.core.barrel),
            refs,
            indexes: Arc::clone(&self.core.indexes),
            mappings: Arc::clone(&self.core.mappings),
        });
        self.last_frozen = self.last_frozen.max(snapshot.version().number());
        snapshot
    }

    /// Checks every storage invariant.
    ///
    /// # Errors
    ///
    /// Returns `Inconsistent` describing each violation found.
    pub fn assert_consistency(&self) -> Result<()> {
        consistency::check(&self.core)
    }

    // =========================================================================
    // External mappings
    // =========================================================================

    /// Writable access to a mapping, created empty if absent.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a mapping with this identifier holds a
    /// different data type.
    pub fn mutable_external_mapping<T: MappingData>(
        &mut self,
        identifier: &str,
    ) -> Result<MutableExternalEntityMapping<'_, T>> {
        let mapping = Arc::make_mut(&mut self.core.mappings)
            .get_mut_or_insert(identifier, || Box::new(ExternalEntityMapping::<T>::default()))
            .as_any_mut()
            .downcast_mut::<ExternalEntityMapping<T>>()
            .ok_or_else(|| {
                Error::internal(format!(
                    "external mapping `{identifier}` holds a different data type"
                ))
            })?;
        Ok(MutableExternalEntityMapping::new(
            mapping,
            &self.core.barrel,
            self.core.lineage,
        ))
    }

    /// Drops a whole mapping. Returns false if it did not exist.
    pub fn remove_external_mapping(&mut self, identifier: &str) -> bool {
        if self.core.mappings.get(identifier).is_none() {
            return false;
        }
        Arc::make_mut(&mut self.core.mappings).remove(identifier)
    }

    pub(crate) fn check_handle(&self, entity: Entity) -> Result<EntityId> {
        if entity.lineage() != self.core.lineage {
            return Err(Error::foreign_entity(entity.id()));
        }
        if !self.core.barrel.contains(entity.id()) {
            return Err(Error::entity_not_found(entity.id()));
        }
        Ok(entity.id())
    }
}

pub(crate) fn schema_of(
    registry: &EntityTypeRegistry,
    class: arbor_foundation::ClassId,
) -> Result<&EntityTypeSchema> {
    registry.schema(class).ok_or_else(|| {
        Error::unknown_type(
            arbor_foundation::intern::class_name(class)
                .map_or_else(|| format!("{class:?}"), |name| name.to_string()),
        )
    })
}

fn check_fit(
    registry: &EntityTypeRegistry,
    connection: ConnectionId,
    parent: arbor_foundation::ClassId,
    child: arbor_foundation::ClassId,
) -> Result<()> {
    if !registry.has_connection(connection) {
        return Err(Error::invalid_connection(format!(
            "{} is not declared",
            connection.debug_str()
        )));
    }
    if !registry.is_a(parent, connection.parent_class())
        || !registry.is_a(child, connection.child_class())
    {
        return Err(Error::invalid_connection(format!(
            "{parent:?} -> {child:?} does not fit {}",
            connection.debug_str()
        )));
    }
    Ok(())
}

fn symbolic_conflict(symbolic: &SymbolicEntityId) -> Error {
    Error::new(ErrorKind::SymbolicIdConflict(symbolic.presentable_name()))
}
