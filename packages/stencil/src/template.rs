//! Entity templates and the template registry.
//!
//! A template is the blueprint a spawned entity is stamped from: its
//! localization keys plus one pre-built value per component type. Templates
//! are built either in code with `EntityTemplate::builder` or from an
//! `EntityDefinition` read out of a content file.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::component::{Component, ComponentTypeID, ComponentValue};
use crate::error::{Error, Result};
use crate::registry::ComponentRegistry;

/// A scalar field value from a content file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_owned())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// One component entry of an entity definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentDefinition {
    /// The component's name, with or without the `Component` suffix.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl ComponentDefinition {
    pub fn new(type_name: impl Into<String>) -> ComponentDefinition {
        ComponentDefinition {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> ComponentDefinition {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// The declarative description of an entity, as read from content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

impl EntityDefinition {
    pub fn new(id: impl Into<String>) -> EntityDefinition {
        EntityDefinition {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            components: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> EntityDefinition {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> EntityDefinition {
        self.description = description.into();
        self
    }

    pub fn with_component(mut self, component: ComponentDefinition) -> EntityDefinition {
        self.components.push(component);
        self
    }
}

/// An immutable blueprint for spawning entities.
#[derive(Debug)]
pub struct EntityTemplate {
    reference_id: Arc<str>,
    name_key: Arc<str>,
    description_key: Arc<str>,
    components: BTreeMap<ComponentTypeID, Box<dyn ComponentValue>>,
}

impl EntityTemplate {
    /// Start building a template for the given reference id.
    pub fn builder(reference_id: impl Into<String>) -> EntityTemplateBuilder {
        EntityTemplateBuilder {
            reference_id: reference_id.into(),
            name_key: String::new(),
            description_key: String::new(),
            components: Vec::new(),
        }
    }

    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    pub fn name_key(&self) -> &str {
        &self.name_key
    }

    pub fn description_key(&self) -> &str {
        &self.description_key
    }

    pub(crate) fn shared_keys(&self) -> (Arc<str>, Arc<str>, Arc<str>) {
        (self.reference_id.clone(), self.name_key.clone(), self.description_key.clone())
    }

    /// Return the number of component types in this template.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Returns true if this template has a component of the given type.
    pub fn has(&self, id: ComponentTypeID) -> bool {
        self.components.contains_key(&id)
    }

    /// Iterate over the stored component values in type ID order.
    pub fn components(&self) -> impl Iterator<Item=(ComponentTypeID, &dyn ComponentValue)> + '_ {
        self.components.iter().map(|(id, value)| (*id, &**value))
    }

    /// Borrow the stored value of a component type.
    pub fn component<T: Component>(&self, registry: &ComponentRegistry) -> Option<&T> {
        let id = registry.try_id_of::<T>()?;
        self.components.get(&id)?.as_any().downcast_ref::<T>()
    }
}

enum PendingComponent {
    Typed(fn(&ComponentRegistry) -> ComponentTypeID, Box<dyn ComponentValue>),
    Erased(ComponentTypeID, Box<dyn ComponentValue>),
}

/// Builds `EntityTemplate`s.
pub struct EntityTemplateBuilder {
    reference_id: String,
    name_key: String,
    description_key: String,
    components: Vec<PendingComponent>,
}

impl EntityTemplateBuilder {
    /// Set the localization key of the entity's name.
    pub fn name(mut self, key: impl Into<String>) -> EntityTemplateBuilder {
        self.name_key = key.into();
        self
    }

    /// Set the localization key of the entity's description.
    pub fn description(mut self, key: impl Into<String>) -> EntityTemplateBuilder {
        self.description_key = key.into();
        self
    }

    /// Add a component value. A later value of the same type replaces an
    /// earlier one.
    pub fn component<T: Component>(mut self, value: T) -> EntityTemplateBuilder {
        self.components.push(PendingComponent::Typed(
            |registry| registry.get_or_register::<T>(),
            Box::new(value)));
        self
    }

    /// Add a type-erased component value of a registered type.
    pub fn component_value(mut self, id: ComponentTypeID, value: Box<dyn ComponentValue>) -> EntityTemplateBuilder {
        self.components.push(PendingComponent::Erased(id, value));
        self
    }

    /// Validate and build the template.
    pub fn build(self, registry: &ComponentRegistry) -> Result<EntityTemplate> {
        if self.reference_id.trim().is_empty() {
            return Err(Error::Validation("entity template has an empty reference id".into()));
        }

        let mut components = BTreeMap::new();
        for pending in self.components {
            let (id, value) = match pending {
                PendingComponent::Typed(register, value) => (register(registry), value),
                PendingComponent::Erased(id, value) => {
                    let registration = registry.registration(id).ok_or_else(|| {
                        Error::Validation(format!("template {:?} uses unregistered component type {:?}",
                                                  self.reference_id, id))
                    })?;
                    if !registration.accepts(&*value) {
                        return Err(Error::TypeMismatch {
                            expected: registration.name(),
                            actual: value.component_name(),
                        });
                    }
                    (id, value)
                }
            };
            components.insert(id, value);
        }

        Ok(EntityTemplate {
            reference_id: self.reference_id.into(),
            name_key: self.name_key.into(),
            description_key: self.description_key.into(),
            components,
        })
    }
}

/// The set of known templates, keyed by reference id.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<EntityTemplate>>,
    overwrites: usize,
}

impl TemplateRegistry {
    pub fn new() -> TemplateRegistry {
        TemplateRegistry::default()
    }

    /// Build a template from a content definition.
    ///
    /// Unknown component names, unknown fields and unconvertible values are
    /// logged and skipped; only a definition with no id is rejected.
    pub fn build(definition: &EntityDefinition, registry: &ComponentRegistry) -> Result<EntityTemplate> {
        if definition.id.trim().is_empty() {
            return Err(Error::Validation(format!(
                "entity definition {:?} has no id", definition.name)));
        }

        let mut builder = EntityTemplate::builder(definition.id.clone())
            .name(definition.name.clone())
            .description(definition.description.clone());

        for component in &definition.components {
            let id = match registry.resolve(&component.type_name) {
                Some(id) => id,
                None => {
                    warn!(entity = %definition.id, component = %component.type_name,
                          "unknown component type, skipping");
                    continue;
                }
            };

            let mut value = registry.create_default_value(id)?;
            for (field, raw) in &component.fields {
                if let Err(err) = registry.set_field(id, &mut *value, field, &raw.to_string()) {
                    warn!(entity = %definition.id, "{}", err);
                }
            }

            builder = builder.component_value(id, value);
        }

        builder.build(registry)
    }

    /// Register a template, returning the one it replaced.
    pub fn register(&mut self, template: EntityTemplate) -> Option<Arc<EntityTemplate>> {
        let key = template.reference_id().to_owned();
        let previous = self.templates.insert(key.clone(), Arc::new(template));
        if previous.is_some() {
            self.overwrites += 1;
            warn!(reference_id = %key, "template registered twice, replacing the earlier one");
        } else {
            debug!(reference_id = %key, "registered template");
        }
        previous
    }

    /// Build a template from a definition and register it.
    pub fn register_definition(&mut self, definition: &EntityDefinition, registry: &ComponentRegistry) -> Result<Arc<EntityTemplate>> {
        let template = TemplateRegistry::build(definition, registry)?;
        let key = template.reference_id().to_owned();
        self.register(template);
        self.get(&key).map(Arc::clone)
    }

    /// Fetch a template by reference id.
    pub fn get(&self, reference_id: &str) -> Result<&Arc<EntityTemplate>> {
        self.try_get(reference_id)
            .ok_or_else(|| Error::TemplateNotFound(reference_id.to_owned()))
    }

    pub fn try_get(&self, reference_id: &str) -> Option<&Arc<EntityTemplate>> {
        self.templates.get(reference_id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=&Arc<EntityTemplate>> + '_ {
        self.templates.values()
    }

    /// Return how many registrations replaced an existing template since the
    /// registry was created or last cleared.
    pub fn overwrites(&self) -> usize {
        self.overwrites
    }

    pub fn clear(&mut self) {
        self.templates.clear();
        self.overwrites = 0;
    }
}
