//! Replaying the journal of one builder onto another.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_foundation::{EntityId, Error, ErrorKind, Result};

use crate::builder::{MutableEntityStorage, schema_of};
use crate::entity::EntityData;
use crate::journal::ChangeEntry;
use crate::refs::EdgeRead;

impl MutableEntityStorage {
    /// Replays the net changes recorded by `source` onto this builder.
    ///
    /// Entities added in `source` get fresh ids here; edges and external
    /// mapping entries that mention them are translated. Replaced entities
    /// get their new data and edge edits; removed entities are removed with
    /// the usual cascade. Changes that target entities missing here are
    /// logged and skipped. Added entities whose mandatory parent is missing
    /// here are dropped along with their subtrees.
    ///
    /// `source` must either have been created from scratch, or be based on
    /// a snapshot of this builder's lineage that is not newer than the
    /// newest snapshot this builder descends from or produced. A journal is
    /// applied at most once until `source` resets its changes.
    ///
    /// # Errors
    ///
    /// Returns `ReconciliationPrecondition` if the precondition fails,
    /// `source` is this builder or a clone of it, or its journal was already
    /// applied. A replay that fails midway, including on the strict
    /// consistency check, leaves this builder as it was.
    pub fn apply_changes_from(&mut self, source: &MutableEntityStorage) -> Result<()> {
        self.check_apply_precondition(source)?;
        self.bump_modification_count();
        self.atomically(|this| this.replay(source))?;
        source.mark_applied();
        Ok(())
    }

    fn replay(&mut self, source: &MutableEntityStorage) -> Result<()> {
        let registry = Arc::clone(&self.core.registry);
        let entries = source.journal.ordered();
        tracing::debug!(entries = entries.len(), "applying changes");

        // Added entities first, so every later reference can be translated.
        let mut translation: HashMap<EntityId, EntityId> = HashMap::new();
        for (id, entry) in &entries {
            if let ChangeEntry::Add { data } = entry {
                let schema = schema_of(&registry, id.class)?;
                let added = self.insert_entity(schema, EntityData::clone(data))?;
                translation.insert(*id, added);
            }
        }
        let translate = |id: EntityId| translation.get(&id).copied().unwrap_or(id);
        tracing::debug!(added = translation.len(), "added entities");

        let mut orphans = Vec::new();
        for (original, added) in &translation {
            for connection in registry.connections_as_child(original.class) {
                let parent = source
                    .core
                    .refs
                    .parent_of(connection, *original)
                    .map(translate)
                    .filter(|parent| self.core.barrel.contains(*parent));
                match parent {
                    Some(parent) => self.attach(connection, parent, *added)?,
                    None if !connection.can_remove_parent() => {
                        tracing::warn!(
                            entity = ?added,
                            connection = %connection.debug_str(),
                            "mandatory parent of an added entity is missing, dropping it"
                        );
                        orphans.push(*added);
                    }
                    None => {}
                }
            }
        }
        tracing::debug!("restored edges of added entities");

        for (id, entry) in &entries {
            let ChangeEntry::Replace(replace) = entry else {
                continue;
            };
            if !self.core.barrel.contains(*id) {
                tracing::error!(entity = ?id, "replaced entity is missing in the target, skipping");
                continue;
            }
            if replace.old != replace.new {
                let schema = schema_of(&registry, id.class)?;
                self.update_data(*id, schema, EntityData::clone(&replace.new))?;
            }
            for (connection, child) in &replace.removed_children {
                let child = translate(*child);
                if connection.can_remove_parent()
                    && self.core.refs.parent_of(*connection, child) == Some(*id)
                {
                    self.detach(*connection, child);
                }
            }
            for (connection, child) in &replace.added_children {
                let child = translate(*child);
                if self.core.barrel.contains(child) && self.core.barrel.contains(*id) {
                    self.attach(*connection, *id, child)?;
                }
            }
            for (connection, parent) in &replace.parents {
                if !self.core.barrel.contains(*id) {
                    break;
                }
                match parent.map(translate) {
                    Some(parent) if self.core.barrel.contains(parent) => {
                        self.attach(*connection, parent, *id)?;
                    }
                    Some(parent) => tracing::error!(
                        entity = ?id,
                        parent = ?parent,
                        "new parent is missing in the target, keeping the current one"
                    ),
                    None if connection.can_remove_parent() => {
                        self.detach(*connection, *id);
                    }
                    None => tracing::error!(
                        entity = ?id,
                        connection = %connection.debug_str(),
                        "cannot detach an entity from a mandatory parent, skipping"
                    ),
                }
            }
        }
        tracing::debug!("replayed replacements");

        for id in &orphans {
            if self.core.barrel.contains(*id) {
                self.remove_cascade(*id);
            }
        }
        for (id, entry) in &entries {
            if matches!(entry, ChangeEntry::Remove { .. }) {
                if self.core.barrel.contains(*id) {
                    self.remove_cascade(*id);
                } else {
                    tracing::debug!(entity = ?id, "removed entity is already gone");
                }
            }
        }
        tracing::debug!(orphans = orphans.len(), "replayed removals");

        self.transfer_mappings(source, &translation);

        if self.core.config.strict_consistency {
            self.assert_consistency()
                .map_err(|err| err.in_operation("apply_changes_from"))?;
        }
        Ok(())
    }

    fn check_apply_precondition(&self, source: &MutableEntityStorage) -> Result<()> {
        if source.instance() == self.instance() {
            return Err(precondition("a builder cannot apply its own changes"));
        }
        if source.is_applied() {
            return Err(precondition("the source builder's changes were already applied"));
        }
        let Some(base) = source.base_version() else {
            return Ok(());
        };
        if base.lineage() != self.core.lineage {
            return Err(precondition("source builder is based on a foreign storage"));
        }
        if base.number() > self.newest_version() {
            return Err(precondition(
                "source builder is based on a snapshot newer than the target",
            ));
        }
        Ok(())
    }

    fn transfer_mappings(
        &mut self,
        source: &MutableEntityStorage,
        translation: &HashMap<EntityId, EntityId>,
    ) {
        for identifier in source.core.mappings.identifiers() {
            let Some(mapping) = source.core.mappings.get(identifier) else {
                continue;
            };
            let moved: Vec<(EntityId, EntityId)> = mapping
                .mapped_entities()
                .into_iter()
                .filter_map(|from| translation.get(&from).map(|to| (from, *to)))
                .collect();
            if moved.is_empty() {
                continue;
            }
            let target = Arc::make_mut(&mut self.core.mappings)
                .get_mut_or_insert(identifier, || mapping.empty_box());
            for (from, to) in moved {
                mapping.copy_entry(from, target, to);
            }
            tracing::debug!(mapping = %identifier, "transferred external mapping entries");
        }
    }
}

fn precondition(message: &str) -> Error {
    Error::new(ErrorKind::ReconciliationPrecondition(message.to_string()))
}
