//! Bundles: the component values an entity is created with.

use std::sync::Arc;

pub use stratum_macros::Bundle;

use crate::component::{Component, ComponentInfo};
use crate::entity::{EntityHandle, EntityId, EntityRecord};
use crate::manager::ManagerCell;
use crate::schema::Blueprint;
use crate::signature::Signature;
use crate::storage::SegmentedMap;

/// Trait for bundles, the initial set of component values of an entity.
///
/// The bundle's component list is the entity's creation signature. Tag
/// components contribute their (zero-sized) value like any other component;
/// only their presence is recorded.
///
/// Implemented for every [`Component`], for tuples of bundles up to length
/// 16, and derivable for structs whose fields are all bundles.
pub trait Bundle: 'static {
    /// Appends the components of this bundle, in declaration order.
    fn components(out: &mut Vec<ComponentInfo>);

    /// Moves the bundle's values into storage.
    fn write(self, writer: &mut BundleWriter<'_>);
}

/// Sink for the component values of a spawning entity.
///
/// Routes every value to the storage plane of the component's owning
/// manager, creating the projection record there first if the entity has
/// none yet.
pub struct BundleWriter<'w> {
    pub(crate) domain: &'w [Arc<ManagerCell>],
    pub(crate) blueprint: &'static Blueprint,
    pub(crate) root: EntityId,
}

impl BundleWriter<'_> {
    /// Moves one component value into the storage of its owning manager.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not in the spawning manager's vocabulary.
    pub fn write<C: Component>(&mut self, component: C) {
        let info = ComponentInfo::of::<C>();

        if info.is_tag() {
            // presence is recorded in the entity signature only
            return;
        }

        let meta = self.blueprint.expect_meta::<C>();
        let slot = meta.owner_slot;
        let storage_index = meta
            .owner_storage_index
            .expect("storage components index their owner's storage plane");
        let projection = self.ensure_projection(slot);
        let cell = &self.domain[slot];

        cell.storages[storage_index]
            .borrow_mut()
            .as_any_mut()
            .downcast_mut::<SegmentedMap<EntityId, C>>()
            .expect("storage column holds its declared component type")
            .insert(projection, component);
        cell.core.borrow_mut().component_entities[meta.owner_my_index]
            .push(projection);
    }

    /// Returns the entity's projection id in the manager at `slot`, creating
    /// the projection record on first use.
    fn ensure_projection(&mut self, slot: usize) -> EntityId {
        let self_slot = self.blueprint.self_slot();
        let existing = self.domain[self_slot].core.borrow().entities
            [self.root.index()]
        .projections[slot];

        if let Some(projection) = existing {
            return projection;
        }

        let base_cell = &self.domain[slot];
        let base_blueprint = base_cell.blueprint;
        let projection = {
            let mut core = base_cell.core.borrow_mut();
            let id = EntityId::from_index(core.entities.len());
            let mut projections =
                vec![None; base_blueprint.num_managers()].into_boxed_slice();

            projections[base_blueprint.self_slot()] = Some(id);

            core.entities.push(EntityRecord {
                id,
                // bits are propagated once the whole bundle is written
                signature: Signature::empty(base_blueprint.num_components()),
                projections,
                origin: Some(EntityHandle {
                    cell: Arc::downgrade(&self.domain[self_slot]),
                    id: self.root,
                }),
                live: true,
            });

            id
        };

        self.domain[self_slot].core.borrow_mut().entities[self.root.index()]
            .projections[slot] = Some(projection);

        projection
    }
}

impl<C: Component> Bundle for C {
    fn components(out: &mut Vec<ComponentInfo>) {
        out.push(ComponentInfo::of::<C>());
    }

    fn write(self, writer: &mut BundleWriter<'_>) {
        writer.write(self);
    }
}

macro_rules! tuple_impl {
    ($($b:ident),*) => {
        tuple_impl!([] [$($b)*]);
    };

    ([$($b:ident)*] []) => {
        impl<$($b),*> Bundle for ($($b,)*)
        where
            $($b: Bundle),*
        {
            #[allow(unused)]
            fn components(out: &mut Vec<ComponentInfo>) {
                $($b::components(out);)*
            }

            #[allow(unused, non_snake_case)]
            fn write(self, writer: &mut BundleWriter<'_>) {
                let ($($b,)*) = self;

                $(
                    $b.write(writer);
                )*
            }
        }
    };

    ([$($rest:ident)*]  [$head:ident $($tail:ident)*]) => {
        tuple_impl!([$($rest)*] []);
        tuple_impl!([$($rest)* $head] [$($tail)*]);
    };
}

tuple_impl!(
    B0, B1, B2, B3, B4, B5, B6, B7, B8, B9, B10, B11, B12, B13, B14, B15
);
