//! Entities and their component slot tables.
//!
//! An entity carries no component data itself. For every registered component
//! type it records the index of its instance in that type's dense storage, or
//! nothing if it lacks the component.

use std::sync::Arc;

use crate::component::ComponentTypeID;
use crate::localization::Localization;

/// A runtime entity ID, unique within a `Universe` and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityID(usize);

impl EntityID {
    /// Construct a new `EntityID` from the inner value.
    pub fn new(inner: usize) -> EntityID {
        EntityID(inner)
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> usize {
        self.0
    }
}

/// The ID of a `World`, used as a non-owning back-reference from entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorldID(usize);

impl WorldID {
    /// Construct a new `WorldID` from the inner value.
    pub fn new(inner: usize) -> WorldID {
        WorldID(inner)
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> usize {
        self.0
    }
}

/// A spawned entity.
///
/// Entities are deliberately not `Clone`: two entities sharing a slot table
/// would share component instances.
#[derive(Debug)]
pub struct Entity {
    id: EntityID,
    reference_id: Arc<str>,
    name_key: Arc<str>,
    description_key: Arc<str>,
    world: Option<WorldID>,
    slots: Vec<Option<usize>>,
}

impl Entity {
    /// Create an entity with `slot_count` empty component slots.
    pub(crate) fn new(
        id: EntityID,
        slot_count: usize,
        reference_id: Arc<str>,
        name_key: Arc<str>,
        description_key: Arc<str>,
        world: Option<WorldID>,
    ) -> Entity {
        Entity {
            id,
            reference_id,
            name_key,
            description_key,
            world,
            slots: vec![None; slot_count],
        }
    }

    /// Return the runtime ID of this entity.
    pub fn id(&self) -> EntityID {
        self.id
    }

    /// Return the reference id of the template this entity was spawned from.
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    /// Return the localization key of this entity's name.
    pub fn name_key(&self) -> &str {
        &self.name_key
    }

    /// Return the localization key of this entity's description.
    pub fn description_key(&self) -> &str {
        &self.description_key
    }

    /// Return the world this entity was spawned into, if any.
    pub fn world(&self) -> Option<WorldID> {
        self.world
    }

    /// Resolve this entity's name through a localization table.
    pub fn display_name<'a>(&'a self, localization: &'a Localization) -> &'a str {
        localization.get(&self.name_key)
    }

    /// Resolve this entity's description through a localization table.
    pub fn display_description<'a>(&'a self, localization: &'a Localization) -> &'a str {
        localization.get(&self.description_key)
    }

    /// Return the storage index of this entity's instance of a component type.
    ///
    /// Types registered after the entity was created fall outside the table
    /// and are reported as absent.
    pub fn slot(&self, type_id: ComponentTypeID) -> Option<usize> {
        self.slots.get(type_id.id()).copied().flatten()
    }

    /// Returns true if this entity has a component of the given type.
    pub fn has(&self, type_id: ComponentTypeID) -> bool {
        self.slot(type_id).is_some()
    }

    /// Returns true if this entity has all of the given component types.
    pub fn has_all(&self, type_ids: &[ComponentTypeID]) -> bool {
        type_ids.iter().all(|ty| self.has(*ty))
    }

    /// Iterate over the component types this entity has, with their slots.
    pub fn components(&self) -> impl Iterator<Item=(ComponentTypeID, usize)> + '_ {
        self.slots.iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.map(|slot| (ComponentTypeID::new(id), slot)))
    }

    /// Return the length of the slot table.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Point the slot for a component type at a storage index, growing the
    /// table if the type is newer than the entity.
    pub(crate) fn set_slot(&mut self, type_id: ComponentTypeID, index: usize) {
        let idx = type_id.id();
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, None);
        }
        self.slots[idx] = Some(index);
    }
}

#[cfg(test)]
pub(crate) fn test_entity(id: usize, slot_count: usize) -> Entity {
    Entity::new(EntityID(id), slot_count, "test".into(), "test-name".into(), "test-desc".into(), None)
}
