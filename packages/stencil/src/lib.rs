//! An entity component system driven by declarative templates.
//!
//! Component types are registered with a `ComponentRegistry`, entity
//! blueprints are registered as `EntityTemplate`s (in code or from RON
//! content files) and entities are spawned from them by reference id.

pub use component::{
    Component,
    ComponentSet,
    ComponentTypeID,
    ComponentValue,
};
pub use config::Config;
pub use content::LoadReport;
pub use entity::{Entity, EntityID, WorldID};
pub use error::{Error, FieldError, Result};
pub use localization::Localization;
pub use manager::EntityManager;
pub use query::Query;
pub use registry::{ComponentRegistration, ComponentRegistry};
pub use storage::ComponentArray;
pub use system::{
    System,
    SystemContext,
    SystemManager,
    SystemRegistration,
};
pub use template::{
    ComponentDefinition,
    EntityDefinition,
    EntityTemplate,
    FieldValue,
    TemplateRegistry,
};
pub use universe::Universe;
pub use world::World;

pub mod component;
pub mod error;
mod entity;
pub mod storage;
pub mod registry;

pub mod template;
pub mod manager;
pub mod query;

pub mod universe;
pub mod world;
pub mod system;

pub mod config;
pub mod content;
pub mod localization;
