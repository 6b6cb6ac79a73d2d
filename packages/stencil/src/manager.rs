//! The entity manager.
//!
//! The manager owns the live entities of one world, in spawn order. Entity
//! IDs come from the universe and only ever increase, so the list is always
//! sorted by ID.

use tracing::debug;

use crate::component::ComponentSet;
use crate::entity::{Entity, EntityID, WorldID};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::registry::ComponentRegistry;
use crate::universe::Universe;

/// The list of live entities.
#[derive(Debug, Default)]
pub struct EntityManager {
    entities: Vec<Entity>,
}

impl EntityManager {
    pub fn new() -> EntityManager {
        EntityManager::default()
    }

    /// Spawn a new entity from the template registered under `reference_id`.
    ///
    /// Every component of the template is copied into a fresh storage slot,
    /// so entities spawned from the same template never share data.
    pub fn spawn(&mut self, universe: &mut Universe, reference_id: &str, world: Option<WorldID>) -> Result<&Entity> {
        let template = universe.templates().get(reference_id)?.clone();
        let id = universe.allocate_entity_id();

        let registry = universe.components_mut();
        let (reference_id, name_key, description_key) = template.shared_keys();
        let mut entity = Entity::new(id, registry.count(), reference_id, name_key, description_key, world);

        for (type_id, value) in template.components() {
            registry.insert_value(&mut entity, type_id, value.clone_value())?;
        }

        debug!(entity = id.id(), reference_id = entity.reference_id(),
               components = template.component_count(), "spawned entity");

        self.entities.push(entity);
        let index = self.entities.len() - 1;
        Ok(&self.entities[index])
    }

    /// Forget every live entity.
    ///
    /// Their storage slots are not reclaimed.
    pub fn wipe_all(&mut self) {
        debug!(count = self.entities.len(), "wiping entities");
        self.entities.clear();
    }

    /// Return the live entities in spawn order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn position(&self, id: EntityID) -> Option<usize> {
        self.entities.binary_search_by_key(&id, Entity::id).ok()
    }

    /// Fetch a live entity by ID.
    pub fn entity(&self, id: EntityID) -> Option<&Entity> {
        self.position(id).map(|idx| &self.entities[idx])
    }

    /// Fetch a live entity by ID for mutation.
    pub fn entity_mut(&mut self, id: EntityID) -> Option<&mut Entity> {
        let idx = self.position(id)?;
        Some(&mut self.entities[idx])
    }

    /// Fetch the first entity spawned from the given template.
    pub fn get_by_reference_id(&self, reference_id: &str) -> Result<&Entity> {
        self.try_get_by_reference_id(reference_id)
            .ok_or_else(|| Error::EntityNotFound(format!("reference id {:?}", reference_id)))
    }

    pub fn try_get_by_reference_id(&self, reference_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.reference_id() == reference_id)
    }

    /// Iterate over the entities that have every component in `S`.
    pub fn query<S: ComponentSet>(&self, registry: &ComponentRegistry) -> Query<'_> {
        Query::new::<S>(registry, &self.entities)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use crate::template::EntityTemplate;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Health {
        hp: i32,
    }

    component!(Health { hp });

    #[derive(Debug, Clone, Default)]
    struct Sprite;

    component!(Sprite);

    fn universe() -> Universe {
        let mut universe = Universe::new();
        universe.components().register_all::<(Health, Sprite)>();

        let goblin = EntityTemplate::builder("goblin")
            .name("goblin-name")
            .component(Health { hp: 10 })
            .component(Sprite)
            .build(universe.components())
            .unwrap();
        universe.templates_mut().register(goblin);

        let rock = EntityTemplate::builder("rock")
            .component(Sprite)
            .build(universe.components())
            .unwrap();
        universe.templates_mut().register(rock);
        universe
    }

    #[test]
    fn test_spawn_copies_template() {
        let mut universe = universe();
        let mut manager = EntityManager::new();

        let a = manager.spawn(&mut universe, "goblin", None).unwrap().id();
        let b = manager.spawn(&mut universe, "goblin", None).unwrap().id();
        assert_ne!(a, b);

        let a = manager.entity(a).unwrap();
        let b = manager.entity(b).unwrap();
        assert_eq!(a.name_key(), "goblin-name");

        universe.components_mut().get_component::<Health>(a).unwrap().hp = 3;
        assert_eq!(universe.components_mut().get_component::<Health>(b).unwrap().hp, 10);
        assert_eq!(universe.components().component::<Health>(a).unwrap().hp, 3);
    }

    #[test]
    fn test_spawn_unknown_template() {
        let mut universe = universe();
        let mut manager = EntityManager::new();

        let err = manager.spawn(&mut universe, "dragon", None).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
        assert!(manager.is_empty());

        let first = manager.spawn(&mut universe, "rock", None).unwrap();
        assert_eq!(first.id().id(), 0);
    }

    #[test]
    fn test_lookup() {
        let mut universe = universe();
        let mut manager = EntityManager::new();
        for name in &["rock", "goblin", "goblin"] {
            manager.spawn(&mut universe, name, None).unwrap();
        }

        assert_eq!(manager.len(), 3);
        assert_eq!(manager.get_by_reference_id("goblin").unwrap().id().id(), 1);
        assert!(manager.try_get_by_reference_id("dragon").is_none());
        assert!(matches!(manager.get_by_reference_id("dragon"), Err(Error::EntityNotFound(_))));

        assert!(manager.entity(EntityID::new(2)).is_some());
        assert!(manager.entity(EntityID::new(9)).is_none());
        assert!(manager.entity_mut(EntityID::new(0)).is_some());
    }

    #[test]
    fn test_query_and_wipe() {
        let mut universe = universe();
        let mut manager = EntityManager::new();
        for name in &["rock", "goblin", "rock", "goblin"] {
            manager.spawn(&mut universe, name, None).unwrap();
        }

        let found: Vec<_> = manager.query::<(Health, Sprite)>(universe.components())
            .map(|e| e.id().id())
            .collect();
        assert_eq!(found, vec![1, 3]);
        assert_eq!(manager.query::<Sprite>(universe.components()).count(), 4);

        manager.wipe_all();
        assert!(manager.is_empty());
        assert_eq!(manager.query::<Sprite>(universe.components()).count(), 0);

        let next = manager.spawn(&mut universe, "rock", None).unwrap();
        assert_eq!(next.id().id(), 4);
    }
}
