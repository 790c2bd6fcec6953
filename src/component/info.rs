use std::any::{type_name, TypeId};
use std::hash::{Hash, Hasher};
use std::{fmt, mem};

use super::Component;
use crate::storage::{new_erased_storage, ErasedStorage};

/// A runtime descriptor for a statically-known [`Component`].
///
/// Carries the component's identity, its storage/tag classification and the
/// factory used to allocate its type-erased storage column.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    type_id: TypeId,
    type_name: &'static str,
    is_tag: bool,
    new_storage: fn() -> Box<dyn ErasedStorage>,
}

impl ComponentInfo {
    /// Returns the descriptor of the given component.
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            is_tag: mem::size_of::<C>() == 0,
            new_storage: new_erased_storage::<C>,
        }
    }

    /// Returns the [`TypeId`] of the component.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the [type name](std::any::type_name) of the component.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the component is a tag: zero-sized, tracked only in
    /// entity signatures.
    pub fn is_tag(&self) -> bool {
        self.is_tag
    }

    /// Returns `true` if the component carries data.
    pub fn is_storage(&self) -> bool {
        !self.is_tag
    }

    /// Allocates an empty storage column for this component.
    pub(crate) fn new_storage(&self) -> Box<dyn ErasedStorage> {
        (self.new_storage)()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("type_name", &self.type_name)
            .field("is_tag", &self.is_tag)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.type_name.fmt(f)
    }
}

impl PartialEq for ComponentInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentInfo {}

impl Hash for ComponentInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}
