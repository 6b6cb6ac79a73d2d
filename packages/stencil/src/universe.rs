//! The universe: shared state for every world.

use std::sync::atomic::{self, AtomicUsize};

use tracing::debug;

use crate::config::Config;
use crate::content::{self, LoadReport};
use crate::entity::{EntityID, WorldID};
use crate::error::Result;
use crate::registry::ComponentRegistry;
use crate::template::{EntityDefinition, TemplateRegistry};
use crate::world::World;

/// Owns the component registry, the templates and the ID allocators.
///
/// Entity IDs are unique across all worlds of a universe.
#[derive(Debug)]
pub struct Universe {
    components: ComponentRegistry,
    templates: TemplateRegistry,
    next_entity_id: AtomicUsize,
    next_world_id: AtomicUsize,
}

impl Universe {
    /// Create a new universe with the default settings.
    pub fn new() -> Universe {
        Universe::with_config(&Config::default())
    }

    /// Create a new universe using the storage settings from `config`.
    pub fn with_config(config: &Config) -> Universe {
        Universe {
            components: ComponentRegistry::with_storage_capacity(config.storage_capacity),
            templates: TemplateRegistry::new(),
            next_entity_id: AtomicUsize::new(0),
            next_world_id: AtomicUsize::new(0),
        }
    }

    /// Create a universe from `config` and load the templates under its
    /// content directory.
    ///
    /// Register component types with `load_with` when content refers to them;
    /// names no registered type matches are skipped with a warning.
    pub fn load(config: &Config) -> Result<(Universe, LoadReport)> {
        Universe::load_with(config, |_| {})
    }

    /// Like `load`, calling `setup` on the fresh universe before any content
    /// is read.
    pub fn load_with(config: &Config, setup: impl FnOnce(&mut Universe)) -> Result<(Universe, LoadReport)> {
        let mut universe = Universe::with_config(config);
        setup(&mut universe);
        let report = content::load_directory(&mut universe, &config.content_dir)?;
        Ok((universe, report))
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    /// Build a template from a definition and register it.
    pub fn register_definition(&mut self, definition: &EntityDefinition) -> Result<()> {
        self.templates.register_definition(definition, &self.components)?;
        Ok(())
    }

    /// Create a new, empty world.
    pub fn create_world(&self) -> World {
        let id = WorldID::new(self.next_world_id.fetch_add(1, atomic::Ordering::Relaxed));
        debug!(world = id.id(), "created world");
        World::new(id)
    }

    /// Allocate the next entity ID.
    pub fn allocate_entity_id(&self) -> EntityID {
        EntityID::new(self.next_entity_id.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe::new()
    }
}
