//! Defines manager schemas and their flattened composition.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use self::blueprint::*;
pub use stratum_macros::Schema;
use crate::component::{Component, ComponentInfo};

mod blueprint;

/// Trait for manager schemas: marker types declaring which components a
/// manager owns locally and which managers it composes as bases.
///
/// # Deriving
///
/// `Schema` can be derived with the `#[schema(...)]` attribute:
///
/// ```ignore
/// #[derive(Schema)]
/// #[schema(components(Position, Velocity))]
/// struct Physics;
///
/// #[derive(Schema)]
/// #[schema(components(Dead), bases(Physics))]
/// struct Gameplay;
/// ```
///
/// Composition must form a DAG. Duplicate local components and cyclic
/// composition are rejected when the blueprint is first built.
pub trait Schema: Sized + 'static {
    /// Declares the local components and direct bases of this manager, in
    /// order.
    fn define(schema: &mut SchemaDef);

    /// The flattened composition of this manager.
    fn blueprint() -> &'static Blueprint {
        Blueprint::of::<Self>()
    }
}

/// An identifier for a [`Schema`] type.
#[derive(Clone, Copy, Debug)]
pub struct SchemaId {
    type_id: TypeId,
    name: &'static str,
}

impl SchemaId {
    /// Returns the id of the given schema.
    pub fn of<M: Schema>() -> Self {
        Self { type_id: TypeId::of::<M>(), name: type_name::<M>() }
    }

    /// Returns the [`TypeId`] of the schema type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the [type name](std::any::type_name) of the schema type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for SchemaId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for SchemaId {}

impl Hash for SchemaId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

/// Builder collecting the declarations of a [`Schema`].
///
/// Passed to [`Schema::define`]; the order of calls is the declaration order.
pub struct SchemaDef {
    pub(crate) schema: SchemaId,
    pub(crate) components: Vec<ComponentInfo>,
    pub(crate) bases: Vec<&'static Blueprint>,
}

impl SchemaDef {
    pub(crate) fn new(schema: SchemaId) -> Self {
        Self { schema, components: Vec::new(), bases: Vec::new() }
    }

    /// Declares a local component.
    pub fn component<C: Component>(&mut self) -> &mut Self {
        self.components.push(ComponentInfo::of::<C>());

        self
    }

    /// Declares a direct base manager.
    ///
    /// Builds the base's blueprint first; a compositional cycle panics here.
    pub fn base<B: Schema>(&mut self) -> &mut Self {
        self.bases.push(Blueprint::of::<B>());

        self
    }
}
