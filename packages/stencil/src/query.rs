//! Queries over live entities.
//!
//! A query names a set of component types and yields every entity that has
//! all of them. Matching only looks at entity slot tables; it never touches
//! component storage.

use std::iter::FusedIterator;

use tracing::trace;

use crate::component::{ComponentSet, ComponentTypeID};
use crate::entity::Entity;
use crate::registry::ComponentRegistry;

/// A lazy iterator over the entities matching a set of component types.
///
/// The query borrows the entity list it walks, so entities cannot be spawned
/// while it is alive.
#[derive(Clone)]
pub struct Query<'a> {
    type_ids: Vec<ComponentTypeID>,
    entities: std::slice::Iter<'a, Entity>,
}

impl<'a> Query<'a> {
    /// Create a query for the component set `S` over a list of entities.
    ///
    /// No entity can have a type that was never registered, so a set naming
    /// one matches nothing. Queries never register types.
    pub fn new<S: ComponentSet>(registry: &ComponentRegistry, entities: &'a [Entity]) -> Query<'a> {
        match S::lookup(registry) {
            Some(type_ids) => Query::with_type_ids(type_ids, entities),
            None => {
                trace!(types = S::len(), "query names an unregistered component type");
                Query::with_type_ids(Vec::new(), &[])
            }
        }
    }

    /// Create a query from already resolved component type IDs.
    pub fn with_type_ids(type_ids: Vec<ComponentTypeID>, entities: &'a [Entity]) -> Query<'a> {
        Query {
            type_ids,
            entities: entities.iter(),
        }
    }

    /// Return the component types this query matches on.
    pub fn type_ids(&self) -> &[ComponentTypeID] {
        &self.type_ids
    }
}

impl<'a> Iterator for Query<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let type_ids = &self.type_ids;
        self.entities.by_ref().find(|entity| entity.has_all(type_ids))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entities.size_hint().1)
    }
}

impl<'a> FusedIterator for Query<'a> {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use crate::entity::test_entity;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    struct A;

    component!(A);

    #[derive(Debug, Clone, Default)]
    struct B;

    component!(B);

    #[derive(Debug, Clone, Default)]
    struct C;

    component!(C);

    #[test]
    fn test_query_conjunction() {
        let mut registry = ComponentRegistry::new();
        registry.register_all::<(A, B)>();

        let mut entities: Vec<_> = (0..4).map(|i| test_entity(i, registry.count())).collect();
        registry.add_component::<A>(&mut entities[0]);
        registry.add_component::<B>(&mut entities[0]);
        registry.add_component::<A>(&mut entities[1]);
        registry.add_component::<B>(&mut entities[2]);
        registry.add_component::<A>(&mut entities[3]);
        registry.add_component::<B>(&mut entities[3]);

        let ids: Vec<_> = Query::new::<(A, B)>(&registry, &entities).map(|e| e.id().id()).collect();
        assert_eq!(ids, vec![0, 3]);

        let ids: Vec<_> = Query::new::<A>(&registry, &entities).map(|e| e.id().id()).collect();
        assert_eq!(ids, vec![0, 1, 3]);
    }

    #[test]
    fn test_query_unused_type() {
        let mut registry = ComponentRegistry::new();
        let mut entities = vec![test_entity(0, 0)];
        registry.add_component::<A>(&mut entities[0]);

        let mut query = Query::new::<(A, C)>(&registry, &entities);
        assert!(query.next().is_none());
        assert!(query.next().is_none());
        assert_eq!(registry.count(), 1);
        assert!(registry.try_id_of::<C>().is_none());

        registry.get_or_register::<C>();
        assert_eq!(Query::new::<(A, C)>(&registry, &entities).type_ids().len(), 2);
        assert_eq!(Query::new::<A>(&registry, &entities).count(), 1);
    }

    #[test]
    fn test_query_new_type_while_reading() {
        let mut registry = ComponentRegistry::new();
        let mut entities = vec![test_entity(0, 0)];
        registry.add_component::<A>(&mut entities[0]);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let held = registry.component::<A>(&entities[0]).unwrap();
            let matched = Query::new::<(A, B)>(&registry, &entities).count();
            drop(held);
            let _ = tx.send((matched, registry.count()));
        });

        let result = rx.recv_timeout(Duration::from_secs(5)).expect("query blocked while a component was borrowed");
        assert_eq!(result, (0, 1));
    }

    #[test]
    fn test_query_empty_list() {
        let registry = ComponentRegistry::new();
        assert_eq!(Query::new::<A>(&registry, &[]).count(), 0);
    }
}
