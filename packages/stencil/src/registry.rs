//! The component registry.
//!
//! The registry is the single authority over which component types exist,
//! which `ComponentTypeID` each has, and where each type's dense storage
//! lives.
//!
//! Registration and storage creation only need `&self` and are safe to call
//! from many threads at once, so content scanning can run in parallel.
//! Reading and writing component data goes through `&mut self`, which needs
//! no locking at all during a frame.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{self, AtomicUsize};
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::component::{Component, ComponentSet, ComponentTypeID, ComponentValue, component_key, short_type_name};
use crate::entity::Entity;
use crate::error::{Error, FieldError, Result};
use crate::storage::{ComponentArray, DEFAULT_CAPACITY, ErasedStorage, new_erased_storage};

type ErasedSetter = Box<dyn Fn(&mut dyn ComponentValue, &str) -> Result<(), String> + Send + Sync>;

/// A field of a registered component type, with its setter erased.
struct FieldEntry {
    name: &'static str,
    set: ErasedSetter,
}

/// The dynamic description of a registered component type.
///
/// Everything needed to create, store and populate instances of the type is
/// captured here once, at registration time.
pub struct ComponentRegistration {
    type_id: ComponentTypeID,
    rust_type: TypeId,
    name: &'static str,
    key: String,
    create_default: fn() -> Box<dyn ComponentValue>,
    new_storage: fn(usize) -> Box<dyn ErasedStorage>,
    fields: Vec<FieldEntry>,
}

impl ComponentRegistration {
    /// Create a `ComponentRegistration` for a static type.
    fn new<T: Component>(type_id: ComponentTypeID) -> ComponentRegistration {
        fn create_default<T: Component>() -> Box<dyn ComponentValue> {
            Box::new(T::default())
        }

        let fields = T::fields()
            .iter()
            .map(|(name, setter)| {
                let set: ErasedSetter = Box::new(move |value: &mut dyn ComponentValue, raw: &str| {
                    let actual = value.component_name();
                    match value.as_any_mut().downcast_mut::<T>() {
                        Some(value) => setter(value, raw),
                        None => Err(format!("value is a {}, not a {}", actual, type_name::<T>())),
                    }
                });
                FieldEntry { name, set }
            })
            .collect();

        ComponentRegistration {
            type_id,
            rust_type: TypeId::of::<T>(),
            name: type_name::<T>(),
            key: component_key(type_name::<T>()).to_owned(),
            create_default: create_default::<T>,
            new_storage: new_erased_storage::<T>,
            fields,
        }
    }

    /// Return the unique type ID for this `ComponentRegistration`.
    pub fn type_id(&self) -> ComponentTypeID {
        self.type_id
    }

    /// Return the full type name of the component.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the type name without its module path.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// Return the key content definitions use to name this type.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true if `value` is an instance of this component type.
    pub fn accepts(&self, value: &dyn ComponentValue) -> bool {
        Any::type_id(value.as_any()) == self.rust_type
    }

    /// Create a default-valued instance of this component type.
    pub fn create_default(&self) -> Box<dyn ComponentValue> {
        (self.create_default)()
    }

    /// Iterate over the names of the fields content may set.
    pub fn field_names(&self) -> impl Iterator<Item=&'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Assign a field of `value` from its raw string form.
    ///
    /// The field name is matched case-insensitively.
    pub fn set_field(&self, value: &mut dyn ComponentValue, field: &str, raw: &str) -> Result<(), FieldError> {
        let entry = self.fields.iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
            .ok_or_else(|| FieldError::UnknownField {
                component: self.short_name(),
                field: field.to_owned(),
            })?;

        (entry.set)(value, raw).map_err(|reason| FieldError::Conversion {
            component: self.short_name(),
            field: entry.name.to_owned(),
            value: raw.to_owned(),
            reason,
        })
    }
}

impl Debug for ComponentRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<ComponentRegistration {} #{}>", self.key, self.type_id.id())
    }
}

/// A registered type and its lazily created storage.
struct ComponentEntry {
    registration: Arc<ComponentRegistration>,
    storage: OnceCell<Box<dyn ErasedStorage>>,
}

#[derive(Default)]
struct RegistryTables {
    by_type: HashMap<TypeId, ComponentTypeID>,
    by_key: HashMap<String, ComponentTypeID>,
    entries: Vec<ComponentEntry>,
}

/// The central authority over component types and their storage.
pub struct ComponentRegistry {
    next_id: AtomicUsize,
    storage_capacity: usize,
    tables: RwLock<RegistryTables>,
}

impl ComponentRegistry {
    /// Create an empty registry whose storages start at the default capacity.
    pub fn new() -> ComponentRegistry {
        ComponentRegistry::with_storage_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty registry whose storages start with room for
    /// `storage_capacity` components.
    pub fn with_storage_capacity(storage_capacity: usize) -> ComponentRegistry {
        ComponentRegistry {
            next_id: AtomicUsize::new(0),
            storage_capacity,
            tables: RwLock::new(RegistryTables::default()),
        }
    }

    // Readers may nest while a storage guard is alive, so they must not
    // queue behind a waiting writer.
    fn read(&self) -> RwLockReadGuard<'_, RegistryTables> {
        self.tables.read_recursive()
    }

    /// Return the number of registered component types.
    pub fn count(&self) -> usize {
        self.next_id.load(atomic::Ordering::Acquire)
    }

    /// Return the ID of `T`, registering it if this is its first use.
    pub fn get_or_register<T: Component>(&self) -> ComponentTypeID {
        let rust_type = TypeId::of::<T>();
        if let Some(id) = self.read().by_type.get(&rust_type) {
            return *id;
        }

        let mut tables = self.tables.write();
        // Another thread may have won the race for the write lock.
        if let Some(id) = tables.by_type.get(&rust_type) {
            return *id;
        }

        let id = ComponentTypeID::new(self.next_id.load(atomic::Ordering::Relaxed));
        let registration = Arc::new(ComponentRegistration::new::<T>(id));

        if let Some(previous) = tables.by_key.insert(registration.key.clone(), id) {
            let previous = &tables.entries[previous.id()].registration;
            warn!(key = %registration.key, previous = previous.name, replacement = registration.name,
                  "component key collision; content will resolve to the newer type");
        }
        tables.by_type.insert(rust_type, id);
        tables.entries.push(ComponentEntry {
            registration,
            storage: OnceCell::new(),
        });
        self.next_id.fetch_add(1, atomic::Ordering::Release);

        debug!(component = type_name::<T>(), id = id.id(), "registered component type");
        id
    }

    /// Register every type in a set up front.
    ///
    /// This is the explicit replacement for scanning for component types at
    /// startup: list them once, before content is loaded, so every name used
    /// in content resolves.
    pub fn register_all<S: ComponentSet>(&self) -> Vec<ComponentTypeID> {
        let start = Instant::now();
        let ids = S::register(self);

        info!(count = ids.len(), elapsed_ms = start.elapsed().as_millis() as u64,
              "registered component types");
        for id in &ids {
            if let Some(registration) = self.registration(*id) {
                let fields: Vec<_> = registration.field_names().collect();
                debug!("  {} -> ID {} {:?}", registration.key(), id.id(), fields);
            }
        }

        ids
    }

    /// Return the ID of `T` if it has been registered.
    pub fn try_id_of<T: Component>(&self) -> Option<ComponentTypeID> {
        self.read().by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Return the ID of `T`, failing if it was never registered.
    pub fn id_of<T: Component>(&self) -> Result<ComponentTypeID> {
        self.try_id_of::<T>().ok_or(Error::NotRegistered {
            component: type_name::<T>(),
        })
    }

    /// Fetch the registration for a component type ID.
    pub fn registration(&self, id: ComponentTypeID) -> Option<Arc<ComponentRegistration>> {
        self.read().entries.get(id.id()).map(|e| e.registration.clone())
    }

    /// Fetch the registrations of every registered type, in ID order.
    pub fn registrations(&self) -> Vec<Arc<ComponentRegistration>> {
        self.read().entries.iter().map(|e| e.registration.clone()).collect()
    }

    /// Resolve a component name from content to its type ID.
    ///
    /// Both `Health` and `HealthComponent` resolve to a type named
    /// `HealthComponent`.
    pub fn resolve(&self, name: &str) -> Option<ComponentTypeID> {
        self.read().by_key.get(component_key(name.trim())).copied()
    }

    /// Create a default-valued instance of `T`.
    pub fn create_default<T: Component>(&self) -> T {
        T::default()
    }

    /// Create a default-valued instance of a registered type by ID.
    pub fn create_default_value(&self, id: ComponentTypeID) -> Result<Box<dyn ComponentValue>> {
        let tables = self.read();
        let entry = tables.entries.get(id.id()).ok_or_else(|| unknown_id(id))?;
        Ok(entry.registration.create_default())
    }

    /// Assign a field of a component value of a registered type.
    pub fn set_field(&self, id: ComponentTypeID, value: &mut dyn ComponentValue, field: &str, raw: &str) -> Result<(), FieldError> {
        let registration = self.registration(id).ok_or_else(|| FieldError::UnknownField {
            component: "<unregistered>",
            field: field.to_owned(),
        })?;
        registration.set_field(value, field, raw)
    }

    /// Make sure the storage for `T` exists, returning the type's ID.
    ///
    /// Concurrent first use from several threads creates exactly one storage.
    pub fn ensure_storage<T: Component>(&self) -> ComponentTypeID {
        let id = self.get_or_register::<T>();
        let tables = self.read();
        let entry = &tables.entries[id.id()];
        entry.storage.get_or_init(|| (entry.registration.new_storage)(self.storage_capacity));
        id
    }

    /// Get a shared handle to the storage of `T`, creating it if needed.
    ///
    /// `T` must already be registered. This never takes the registry's write
    /// lock, so it is safe to call while other component guards are alive.
    pub fn storage<T: Component>(&self) -> Result<MappedRwLockReadGuard<'_, ComponentArray<T>>> {
        let id = self.id_of::<T>()?;
        let tables = self.read();
        let entry = &tables.entries[id.id()];
        entry.storage.get_or_init(|| (entry.registration.new_storage)(self.storage_capacity));

        RwLockReadGuard::try_map(tables, |tables| {
            tables.entries[id.id()].storage.get()
                .and_then(|storage| storage.as_any().downcast_ref::<ComponentArray<T>>())
        }).map_err(|_| Error::NotRegistered {
            component: type_name::<T>(),
        })
    }

    /// Get exclusive access to the storage of `T`, creating it if needed.
    pub fn storage_mut<T: Component>(&mut self) -> &mut ComponentArray<T> {
        let id = self.get_or_register::<T>();
        let capacity = self.storage_capacity;
        let entry = &mut self.tables.get_mut().entries[id.id()];
        if entry.storage.get().is_none() {
            let storage = (entry.registration.new_storage)(capacity);
            let _ = entry.storage.set(storage);
        }

        entry.storage.get_mut()
            .and_then(|storage| storage.as_any_mut().downcast_mut::<ComponentArray<T>>())
            .expect("storage is created with the registered type")
    }

    /// Get exclusive type-erased access to a storage by ID, creating it if needed.
    fn erased_storage_mut(&mut self, id: ComponentTypeID) -> Result<&mut Box<dyn ErasedStorage>> {
        let capacity = self.storage_capacity;
        let entry = self.tables.get_mut().entries.get_mut(id.id()).ok_or_else(|| unknown_id(id))?;
        if entry.storage.get().is_none() {
            let storage = (entry.registration.new_storage)(capacity);
            let _ = entry.storage.set(storage);
        }

        entry.storage.get_mut().ok_or_else(|| unknown_id(id))
    }

    /// Return the number of slots in the storage of a type, 0 if it has none.
    pub fn storage_len(&self, id: ComponentTypeID) -> usize {
        self.read().entries.get(id.id())
            .and_then(|entry| entry.storage.get())
            .map_or(0, |storage| storage.len())
    }

    /// Add a default-valued `T` to an entity, returning it for initialisation.
    pub fn add_component<T: Component>(&mut self, entity: &mut Entity) -> &mut T {
        self.insert_component(entity, T::default())
    }

    /// Add `value` to an entity, returning a reference to the stored copy.
    ///
    /// If the entity already had a `T`, it is repointed at the new slot.
    pub fn insert_component<T: Component>(&mut self, entity: &mut Entity, value: T) -> &mut T {
        let id = self.get_or_register::<T>();
        let storage = self.storage_mut::<T>();
        let index = storage.append_value(value);
        entity.set_slot(id, index);
        &mut storage.as_mut_slice()[index]
    }

    /// Add a default-valued component of a registered type to an entity,
    /// returning the new slot index.
    pub fn add_default_value(&mut self, entity: &mut Entity, id: ComponentTypeID) -> Result<usize> {
        let index = self.erased_storage_mut(id)?.append_default();
        entity.set_slot(id, index);
        Ok(index)
    }

    /// Add a type-erased value to an entity, returning the new slot index.
    pub(crate) fn insert_value(&mut self, entity: &mut Entity, id: ComponentTypeID, value: Box<dyn ComponentValue>) -> Result<usize> {
        let index = self.erased_storage_mut(id)?.append_value(value)?;
        entity.set_slot(id, index);
        Ok(index)
    }

    /// Returns true if the entity has a `T`.
    pub fn has_component<T: Component>(&self, entity: &Entity) -> bool {
        self.try_id_of::<T>().map_or(false, |id| entity.has(id))
    }

    fn slot_of<T: Component>(&self, entity: &Entity) -> Result<usize> {
        let id = self.id_of::<T>()?;
        entity.slot(id).ok_or(Error::MissingComponent {
            entity: entity.id(),
            component: type_name::<T>(),
        })
    }

    /// Get a mutable reference to the entity's `T`.
    pub fn get_component<T: Component>(&mut self, entity: &Entity) -> Result<&mut T> {
        let index = self.slot_of::<T>(entity)?;
        self.storage_mut::<T>().at_mut(index)
    }

    /// Get a mutable reference to the entity's `T` if it has one.
    pub fn try_get_component<T: Component>(&mut self, entity: &Entity) -> Option<&mut T> {
        self.get_component::<T>(entity).ok()
    }

    /// Read the entity's `T` through a shared handle.
    pub fn component<T: Component>(&self, entity: &Entity) -> Result<MappedRwLockReadGuard<'_, T>> {
        let index = self.slot_of::<T>(entity)?;
        let storage = self.storage::<T>()?;
        storage.at(index)?;
        Ok(MappedRwLockReadGuard::map(storage, |storage| &storage.as_slice()[index]))
    }

    /// Borrow the entity's component of the given type without knowing the
    /// type statically.
    pub fn component_value(&self, entity: &Entity, id: ComponentTypeID) -> Result<MappedRwLockReadGuard<'_, dyn ComponentValue>> {
        let tables = self.read();
        let entry = tables.entries.get(id.id()).ok_or_else(|| unknown_id(id))?;
        let index = entity.slot(id).ok_or(Error::MissingComponent {
            entity: entity.id(),
            component: entry.registration.name,
        })?;
        let storage = entry.storage.get().ok_or(Error::OutOfRange {
            component: entry.registration.name,
            index,
            len: 0,
        })?;
        storage.value_at(index)?;

        Ok(RwLockReadGuard::map(tables, |tables| {
            tables.entries[id.id()].storage.get()
                .and_then(|storage| storage.value_at(index).ok())
                .expect("slot was checked above")
        }))
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        ComponentRegistry::new()
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.read().entries.iter().map(|e| &e.registration))
            .finish()
    }
}

fn unknown_id(id: ComponentTypeID) -> Error {
    debug!(id = id.id(), "lookup of unknown component type ID");
    Error::NotRegistered {
        component: "<unknown component type>",
    }
}
