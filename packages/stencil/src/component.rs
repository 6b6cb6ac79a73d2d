//! Base definitions for components.
//!
//! Components are plain data records. Every component type is assigned a
//! dense `ComponentTypeID` by the `ComponentRegistry` the first time it is
//! used. There is a macro (`component`) to implement `Component` along with
//! the table of fields content files may set.

use std::any::{type_name, Any};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use crate::registry::ComponentRegistry;

/// A component type ID which is unique for a specific component type within
/// a registry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeID(usize);

impl ComponentTypeID {
    /// Construct a new `ComponentTypeID` from the inner value.
    pub(crate) fn new(inner: usize) -> ComponentTypeID {
        ComponentTypeID(inner)
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> usize {
        self.0
    }
}

impl Debug for ComponentTypeID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeID(#{})", self.0)
    }
}

/// The component trait is implemented on all component types.
///
/// `Default` provides the blank instance used when a component is added
/// without data, and `Clone` lets templates stamp their stored values into
/// new entities.
pub trait Component: Default + Clone + Debug + Send + Sync + 'static {
    /// The fields content definitions may assign on this component.
    fn fields() -> FieldTable<Self> {
        FieldTable::new()
    }
}

/// A setter assigning one field of a component from its raw string form.
pub type FieldSetter<T> = fn(&mut T, &str) -> Result<(), String>;

/// The table of named, writable fields of a component type.
pub struct FieldTable<T> {
    fields: Vec<(&'static str, FieldSetter<T>)>,
}

impl<T> FieldTable<T> {
    /// Create an empty field table.
    pub fn new() -> FieldTable<T> {
        FieldTable { fields: Vec::new() }
    }

    /// Add a field to the table.
    pub fn with(mut self, name: &'static str, setter: FieldSetter<T>) -> FieldTable<T> {
        self.fields.push((name, setter));
        self
    }

    /// Return the number of fields in the table.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the table has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item=(&'static str, FieldSetter<T>)> + '_ {
        self.fields.iter().copied()
    }
}

impl<T> Default for FieldTable<T> {
    fn default() -> Self {
        FieldTable::new()
    }
}

/// Parse `raw` into a field slot.
///
/// This is what the `component` macro uses for each listed field; any field
/// type implementing `FromStr` can be set from content.
pub fn parse_field<V>(slot: &mut V, raw: &str) -> Result<(), String>
    where V: FromStr, V::Err: Display
{
    *slot = raw.trim().parse::<V>().map_err(|e| e.to_string())?;
    Ok(())
}

/// A type-erased component value.
///
/// Implemented for every `Component`; used wherever component values are
/// handled by runtime type ID (templates, content loading).
pub trait ComponentValue: Any + Debug + Send + Sync {
    /// Clone this value into a new box.
    fn clone_value(&self) -> Box<dyn ComponentValue>;

    /// Return the type name of the concrete component.
    fn component_name(&self) -> &'static str;

    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into a boxed `Any` for an owned downcast.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Component> ComponentValue for T {
    fn clone_value(&self) -> Box<dyn ComponentValue> {
        Box::new(self.clone())
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Clone for Box<dyn ComponentValue> {
    fn clone(&self) -> Self {
        (**self).clone_value()
    }
}

impl<'a> dyn ComponentValue + 'a {
    /// Attempt to downcast this value to a concrete component type.
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Attempt to mutably downcast this value to a concrete component type.
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Strip the module path (and any generic arguments) from a type name.
pub(crate) fn short_type_name(name: &str) -> &str {
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

/// The content lookup key for a type name: the short name without a
/// trailing `Component`.
pub(crate) fn component_key(name: &str) -> &str {
    let short = short_type_name(name);
    match short.strip_suffix("Component") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => short,
    }
}

/// A list of component types, implemented for single components and tuples.
///
/// Used to register many types at once and to name the types of a query.
pub trait ComponentSet {
    /// Register every type in the set, returning their IDs in order.
    fn register(registry: &ComponentRegistry) -> Vec<ComponentTypeID>;

    /// Look up the IDs of every type in the set without registering any.
    ///
    /// Returns `None` if any type in the set was never registered.
    fn lookup(registry: &ComponentRegistry) -> Option<Vec<ComponentTypeID>>;

    /// Return the number of types in the set.
    fn len() -> usize;
}

impl<T: Component> ComponentSet for T {
    fn register(registry: &ComponentRegistry) -> Vec<ComponentTypeID> {
        vec![registry.get_or_register::<T>()]
    }

    fn lookup(registry: &ComponentRegistry) -> Option<Vec<ComponentTypeID>> {
        registry.try_id_of::<T>().map(|id| vec![id])
    }

    fn len() -> usize { 1 }
}

macro_rules! impl_component_set {
    ($($t:ident),+) => {
        impl<$($t: Component),+> ComponentSet for ($($t,)+) {
            fn register(registry: &ComponentRegistry) -> Vec<ComponentTypeID> {
                vec![$(registry.get_or_register::<$t>()),+]
            }

            fn lookup(registry: &ComponentRegistry) -> Option<Vec<ComponentTypeID>> {
                Some(vec![$(registry.try_id_of::<$t>()?),+])
            }

            fn len() -> usize {
                [$(stringify!($t)),+].len()
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// Implement the `Component` trait on a type.
///
/// Component types must implement `Default`, `Clone` and `Debug`. Listing
/// fields in braces makes them assignable from content definitions; each
/// listed field's type must implement `FromStr`.
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// pub struct Health { pub hp: i32 }
///
/// component!(Health { hp });
/// ```
#[macro_export]
macro_rules! component {
    ($i:ident) => {
        impl $crate::component::Component for $i {}
    };
    ($i:ident { $($field:ident),* $(,)? }) => {
        impl $crate::component::Component for $i {
            fn fields() -> $crate::component::FieldTable<Self> {
                $crate::component::FieldTable::new()
                    $(.with(stringify!($field), |component: &mut $i, raw: &str| {
                        $crate::component::parse_field(&mut component.$field, raw)
                    }))*
            }
        }
    };
}
