//! Commonly used items.

pub use crate::{
    Blueprint,
    Bundle,
    CommandQueue,
    Component,
    Contains,
    EntityHandle,
    EntityId,
    EntityNotFound,
    Manager,
    Schema,
    SchemaDef,
    SchemaId,
};
