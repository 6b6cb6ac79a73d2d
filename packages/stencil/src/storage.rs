//! Dense per-type component storage.
//!
//! Each component type gets one `ComponentArray`, a contiguous, append-only
//! list of instances. Iterating every instance of one type is a linear scan.
//! Slots are never removed or compacted, so an index handed out by `append`
//! stays valid for the lifetime of the storage.

use std::any::{type_name, Any};

use crate::component::{Component, ComponentValue};
use crate::error::{Error, Result};

/// The default number of slots allocated for a new storage.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Append-only, contiguous storage for a single component type.
#[derive(Debug, Clone)]
pub struct ComponentArray<T: Component> {
    items: Vec<T>,
}

impl<T: Component> ComponentArray<T> {
    /// Create an empty storage with the default capacity.
    pub fn new() -> ComponentArray<T> {
        ComponentArray::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty storage with room for `capacity` components.
    pub fn with_capacity(capacity: usize) -> ComponentArray<T> {
        ComponentArray {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Return the number of live slots.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no slot has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return the number of slots available before the next growth.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Double the backing capacity if every slot is in use.
    fn grow_if_full(&mut self) {
        let capacity = self.items.capacity();
        if self.items.len() == capacity {
            self.items.reserve_exact(capacity.max(1));
        }
    }

    /// Append a default-valued slot, returning its index and a reference for
    /// initialising it in place.
    pub fn append(&mut self) -> (usize, &mut T) {
        let index = self.append_value(T::default());
        (index, &mut self.items[index])
    }

    /// Append a slot holding `value`, returning its index.
    pub fn append_value(&mut self, value: T) -> usize {
        self.grow_if_full();
        self.items.push(value);
        self.items.len() - 1
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::OutOfRange {
            component: type_name::<T>(),
            index,
            len: self.items.len(),
        }
    }

    /// Get the component at `index`.
    pub fn at(&self, index: usize) -> Result<&T> {
        match self.items.get(index) {
            Some(item) => Ok(item),
            None => Err(self.out_of_range(index)),
        }
    }

    /// Get a mutable reference to the component at `index`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        if index >= self.items.len() {
            return Err(self.out_of_range(index));
        }
        Ok(&mut self.items[index])
    }

    /// Get the live slots as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Get the live slots as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Iterate over every live slot.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably over every live slot.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T: Component> Default for ComponentArray<T> {
    fn default() -> Self {
        ComponentArray::new()
    }
}

/// The type-erased interface the registry keeps for every storage.
pub(crate) trait ErasedStorage: Any + Send + Sync {
    /// Return the number of live slots.
    fn len(&self) -> usize;

    /// Append a default-valued slot, returning its index.
    fn append_default(&mut self) -> usize;

    /// Append a boxed value, which must be of this storage's type.
    fn append_value(&mut self, value: Box<dyn ComponentValue>) -> Result<usize>;

    /// Borrow the value at `index` without knowing its type.
    fn value_at(&self, index: usize) -> Result<&(dyn ComponentValue + 'static)>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for ComponentArray<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn append_default(&mut self) -> usize {
        self.append().0
    }

    fn append_value(&mut self, value: Box<dyn ComponentValue>) -> Result<usize> {
        let actual = value.component_name();
        match value.into_any().downcast::<T>() {
            Ok(value) => Ok(ComponentArray::append_value(self, *value)),
            Err(_) => Err(Error::TypeMismatch {
                expected: type_name::<T>(),
                actual,
            }),
        }
    }

    fn value_at(&self, index: usize) -> Result<&(dyn ComponentValue + 'static)> {
        self.at(index).map(|value| value as &(dyn ComponentValue + 'static))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Create a boxed, empty storage for `T`.
pub(crate) fn new_erased_storage<T: Component>(capacity: usize) -> Box<dyn ErasedStorage> {
    Box::new(ComponentArray::<T>::with_capacity(capacity))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Score(i64);

    component!(Score);

    #[derive(Debug, Clone, Default)]
    struct Other;

    component!(Other);

    #[test]
    fn test_append_and_at() {
        let mut storage = ComponentArray::<Score>::with_capacity(2);
        assert!(storage.is_empty());

        let (idx, slot) = storage.append();
        assert_eq!(idx, 0);
        slot.0 = 11;
        assert_eq!(storage.append_value(Score(22)), 1);

        assert_eq!(storage.len(), 2);
        assert_eq!(storage.at(0).unwrap(), &Score(11));
        storage.at_mut(1).unwrap().0 += 1;
        assert_eq!(storage.at(1).unwrap(), &Score(23));
    }

    #[test]
    fn test_capacity_doubles() {
        let mut storage = ComponentArray::<Score>::with_capacity(2);
        storage.append();
        storage.append();
        assert_eq!(storage.capacity(), 2);

        storage.append();
        assert_eq!(storage.capacity(), 4);

        let mut empty = ComponentArray::<Score>::with_capacity(0);
        empty.append();
        assert!(empty.capacity() >= 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut storage = ComponentArray::<Score>::new();
        storage.append();

        match storage.at(1) {
            Err(Error::OutOfRange { index, len, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(len, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(storage.at_mut(5).is_err());
    }

    #[test]
    fn test_erased_append() {
        let mut storage = new_erased_storage::<Score>(4);
        assert_eq!(storage.append_value(Box::new(Score(5))).unwrap(), 0);
        assert_eq!(storage.append_default(), 1);
        assert_eq!(storage.len(), 2);

        let err = storage.append_value(Box::new(Other)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(storage.len(), 2);

        let value = storage.value_at(0).unwrap();
        assert_eq!(value.downcast_ref::<Score>(), Some(&Score(5)));

        let typed = storage.as_any().downcast_ref::<ComponentArray<Score>>().unwrap();
        assert_eq!(typed.as_slice(), &[Score(5), Score(0)]);
    }

    proptest! {
        #[test]
        fn appended_slots_survive_growth(values in prop::collection::vec(any::<i64>(), 0..300)) {
            let mut storage = ComponentArray::<Score>::with_capacity(1);
            for (i, value) in values.iter().enumerate() {
                let (idx, slot) = storage.append();
                prop_assert_eq!(idx, i);
                slot.0 = *value;
            }

            prop_assert_eq!(storage.len(), values.len());
            for (i, value) in values.iter().enumerate() {
                prop_assert_eq!(storage.at(i).unwrap().0, *value);
            }
        }
    }
}
