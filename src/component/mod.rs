//! Defines [`Component`].

use std::any::type_name;

use thiserror::Error;

pub use self::info::*;
pub use stratum_macros::Component;
use crate::entity::EntityId;

mod info;

/// Trait for components, the data stored in an entity.
///
/// A component is either a *storage component* (it carries data) or a *tag
/// component* (it is zero-sized and only contributes to an entity's
/// signature). The partition is derived from the type's size; see
/// [`ComponentInfo::is_tag`].
///
/// # Deriving
///
/// `Component` can be derived. The derive places no requirements on input
/// generics.
pub trait Component: Send + Sync + 'static {}

/// Error when accessing a [`Component`] an entity does not contain.
#[derive(Debug, Clone, Copy, Error)]
#[error("component {component} not found for entity {entity:?}")]
pub struct ComponentNotFound {
    entity: EntityId,
    component: &'static str,
}

impl ComponentNotFound {
    pub(crate) fn new<C: Component>(entity: EntityId) -> Self {
        let component = type_name::<C>();

        Self { entity, component }
    }
}
