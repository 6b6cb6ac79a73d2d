//! Composable systems.
//!
//! A system is run once per world update with mutable access to the world's
//! entities and to component data.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use tracing::{error, trace};

use crate::entity::WorldID;
use crate::error::{Error, Result};
use crate::manager::EntityManager;
use crate::registry::ComponentRegistry;

/// Everything a system may touch during one update.
pub struct SystemContext<'a> {
    pub world: WorldID,
    pub entities: &'a mut EntityManager,
    pub components: &'a mut ComponentRegistry,
    pub delta: Duration,
}

/// An ECS system.
pub trait System: Send {
    /// Update the system.
    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()>;
}

impl<F> System for F
    where F: FnMut(&mut SystemContext<'_>) -> Result<()> + Send
{
    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        self(ctx)
    }
}

type BoxedSystem = Box<dyn System + 'static>;

/// A registration used for adding systems to a `SystemManager`.
pub struct SystemRegistration {
    system: BoxedSystem,
    name: String,
    order: i32,
}

impl SystemRegistration {
    /// Create a new registration from any object implementing `System`.
    pub fn new(system: impl System + 'static) -> SystemRegistration {
        SystemRegistration {
            system: Box::new(system),
            name: "<anonymous>".to_owned(),
            order: 0,
        }
    }

    /// Create a new registration from a closure.
    pub fn from_fn<F>(system: F) -> SystemRegistration
        where F: FnMut(&mut SystemContext<'_>) -> Result<()> + Send + 'static
    {
        SystemRegistration::new(system)
    }

    /// Set the order of this system. Lower orders run first.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Name the system for logs and errors.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }
}

impl Debug for SystemRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<System {} order={}>", self.name, self.order)
    }
}

/// An ordered list of systems.
#[derive(Debug, Default)]
pub struct SystemManager {
    systems: Vec<SystemRegistration>,
}

impl SystemManager {
    pub fn new() -> SystemManager {
        SystemManager::default()
    }

    /// Add a system. Systems with equal order run in the order they were
    /// added.
    pub fn add(&mut self, registration: SystemRegistration) {
        let idx = self.systems.partition_point(|s| s.order <= registration.order);
        self.systems.insert(idx, registration);
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Iterate over the names of the systems in run order.
    pub fn names(&self) -> impl Iterator<Item=&str> + '_ {
        self.systems.iter().map(|s| s.name.as_str())
    }

    /// Run every system once, stopping at the first failure.
    pub fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        for registration in &mut self.systems {
            trace!(system = %registration.name, "updating system");
            if let Err(err) = registration.system.update(ctx) {
                error!(system = %registration.name, "system failed: {}", err);
                return Err(Error::System {
                    name: registration.name.clone(),
                    source: Box::new(err),
                });
            }
        }

        Ok(())
    }
}
