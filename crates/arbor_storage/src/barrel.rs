//! Per-class entity families.
//!
//! Entity data lives in one slot vector per class, indexed by
//! `EntityId::index`. Families are shared between storages and copied the
//! first time a storage writes to them. Indices are handed out in order and
//! a builder never reuses one, so a removed entity leaves an empty slot
//! behind. Sibling builders of one snapshot each continue from the same
//! next index, so their new entities may share ids.

use std::sync::Arc;

use arbor_foundation::{ClassId, EntityId, Error, Result};

use crate::entity::EntityData;

/// Slots of one class.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityFamily {
    slots: Vec<Option<Arc<EntityData>>>,
    live: usize,
}

impl EntityFamily {
    fn get(&self, index: u32) -> Option<&Arc<EntityData>> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    fn next_index(&self) -> Result<u32> {
        u32::try_from(self.slots.len())
            .ok()
            .filter(|&i| i32::try_from(i).is_ok())
            .ok_or_else(|| Error::internal("entity family is full"))
    }

    fn ensure_slot(&mut self, index: u32) {
        let needed = index as usize + 1;
        if self.slots.len() < needed {
            self.slots.resize(needed, None);
        }
    }

    fn ids(&self, class: ClassId) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            // Slot count never exceeds the u32 range checked in next_index
            slot.as_ref().map(|_| EntityId::new(class, i as u32))
        })
    }
}

/// All entity data of a storage.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntitiesBarrel {
    families: Vec<Option<Arc<EntityFamily>>>,
}

impl EntitiesBarrel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn family(&self, class: ClassId) -> Option<&EntityFamily> {
        self.families
            .get(class.index() as usize)
            .and_then(Option::as_ref)
            .map(AsRef::as_ref)
    }

    fn family_mut(&mut self, class: ClassId) -> &mut EntityFamily {
        let position = class.index() as usize;
        if self.families.len() <= position {
            self.families.resize(position + 1, None);
        }
        Arc::make_mut(self.families[position].get_or_insert_with(Default::default))
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Arc<EntityData>> {
        self.family(id.class)?.get(id.index)
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn count(&self, class: ClassId) -> usize {
        self.family(class).map_or(0, |f| f.live)
    }

    pub(crate) fn ids(&self, class: ClassId) -> Box<dyn Iterator<Item = EntityId> + '_> {
        match self.family(class) {
            Some(family) => Box::new(family.ids(class)),
            None => Box::new(std::iter::empty()),
        }
    }

    pub(crate) fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.families.iter().enumerate().filter_map(|(i, family)| {
            family
                .as_ref()
                .filter(|f| f.live > 0)
                .map(|_| ClassId::from_raw(i as u32))
        })
    }

    pub(crate) fn all_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.classes().flat_map(|class| self.ids(class))
    }

    /// Appends a new entity and returns its id.
    pub(crate) fn add(&mut self, class: ClassId, data: Arc<EntityData>) -> Result<EntityId> {
        let family = self.family_mut(class);
        let index = family.next_index()?;
        family.slots.push(Some(data));
        family.live += 1;
        Ok(EntityId::new(class, index))
    }

    /// Stores data at an exact index, growing the family if needed.
    pub(crate) fn fill(&mut self, id: EntityId, data: Arc<EntityData>) {
        let family = self.family_mut(id.class);
        family.ensure_slot(id.index);
        let slot = &mut family.slots[id.index as usize];
        if slot.is_none() {
            family.live += 1;
        }
        *slot = Some(data);
    }

    /// Replaces the data of a live entity, returning the old data.
    pub(crate) fn replace(&mut self, id: EntityId, data: Arc<EntityData>) -> Option<Arc<EntityData>> {
        if !self.contains(id) {
            return None;
        }
        let family = self.family_mut(id.class);
        family.slots[id.index as usize].replace(data)
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Arc<EntityData>> {
        if !self.contains(id) {
            return None;
        }
        let family = self.family_mut(id.class);
        let old = family.slots[id.index as usize].take();
        family.live -= 1;
        old
    }
}
