//! Worlds: a set of live entities and the systems that update them.

use std::time::Duration;

use crate::component::ComponentSet;
use crate::entity::{Entity, EntityID, WorldID};
use crate::error::Result;
use crate::manager::EntityManager;
use crate::query::Query;
use crate::registry::ComponentRegistry;
use crate::system::{SystemContext, SystemManager, SystemRegistration};
use crate::universe::Universe;

/// A world, such as one game scene.
#[derive(Debug)]
pub struct World {
    id: WorldID,
    entities: EntityManager,
    systems: SystemManager,
}

impl World {
    pub(crate) fn new(id: WorldID) -> World {
        World {
            id,
            entities: EntityManager::new(),
            systems: SystemManager::new(),
        }
    }

    pub fn id(&self) -> WorldID {
        self.id
    }

    /// Spawn an entity into this world from a template.
    pub fn spawn(&mut self, universe: &mut Universe, reference_id: &str) -> Result<&Entity> {
        self.entities.spawn(universe, reference_id, Some(self.id))
    }

    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    pub fn entity(&self, id: EntityID) -> Option<&Entity> {
        self.entities.entity(id)
    }

    pub fn entity_mut(&mut self, id: EntityID) -> Option<&mut Entity> {
        self.entities.entity_mut(id)
    }

    /// Iterate over the entities of this world that have every component in `S`.
    pub fn query<S: ComponentSet>(&self, registry: &ComponentRegistry) -> Query<'_> {
        self.entities.query::<S>(registry)
    }

    pub fn add_system(&mut self, registration: SystemRegistration) {
        self.systems.add(registration);
    }

    /// Run every system of this world once.
    pub fn update(&mut self, universe: &mut Universe, delta: Duration) -> Result<()> {
        let mut ctx = SystemContext {
            world: self.id,
            entities: &mut self.entities,
            components: universe.components_mut(),
            delta,
        };
        self.systems.update(&mut ctx)
    }

    /// Remove every entity from this world.
    pub fn destroy(&mut self) {
        self.entities.wipe_all();
    }
}
