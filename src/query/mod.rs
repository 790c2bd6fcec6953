//! Signature queries over the entities of a manager composition.

use std::sync::Arc;

use atomic_refcell::{AtomicRef, AtomicRefCell, AtomicRefMut};

pub use self::filter::*;
use crate::component::{Component, ComponentInfo};
use crate::entity::{EntityHandle, EntityId, EntityRecord};
use crate::manager::{Manager, ManagerCell};
use crate::schema::{Blueprint, Schema};
use crate::storage::{ErasedStorage, SegmentedMap};

mod filter;
mod tuple_impl;

/// The managers a query draws from: the cells of the dispatched base's
/// closure, in that base's closure order.
pub struct QuerySource<'w> {
    pub(crate) domain: &'w [Arc<ManagerCell>],
    pub(crate) blueprint: &'static Blueprint,
}

/// One matched entity record, as seen by [`QueryData::get`].
#[derive(Clone, Copy)]
pub struct EntityView<'a> {
    pub(crate) cell: &'a Arc<ManagerCell>,
    pub(crate) record: &'a EntityRecord,
}

/// Trait for the data a query fetches per matched entity.
///
/// Implemented for `&C` and `&mut C` of storage components, for [`EntityId`]
/// and [`EntityHandle`], and for tuples of these up to length 8. The
/// components named here are part of the query signature; tag components
/// carry no data and are requested with [`Contains`] instead.
pub trait QueryData {
    /// Storage borrows held for the duration of one scan.
    type Guards<'w>;

    /// What the callback receives per matched entity.
    type Item<'g>;

    /// Appends the components this data fetches, in declaration order.
    fn components(out: &mut Vec<ComponentInfo>);

    /// Borrows the storage columns this data reads or writes.
    ///
    /// # Panics
    ///
    /// Panics if a fetched component is outside the source's vocabulary, is
    /// a tag, or is already borrowed conflictingly (for example the same
    /// component twice mutably in one query).
    fn acquire<'w>(source: &QuerySource<'w>) -> Self::Guards<'w>;

    /// Fetches the data of one matched entity.
    fn get<'g>(
        guards: &'g mut Self::Guards<'_>,
        entity: EntityView<'_>,
    ) -> Self::Item<'g>;
}

impl<'w> QuerySource<'w> {
    /// Resolves the owning cell slot and storage column of `C`.
    fn storage_column<C: Component>(
        &self,
    ) -> (usize, &'w AtomicRefCell<Box<dyn ErasedStorage>>) {
        let meta = self.blueprint.expect_meta::<C>();
        let Some(storage_index) = meta.owner_storage_index else {
            panic!(
                "tag component `{}` carries no data; request it with \
                 `Contains`",
                std::any::type_name::<C>(),
            );
        };

        (meta.owner_slot, &self.domain[meta.owner_slot].storages[storage_index])
    }
}

impl<'a> EntityView<'a> {
    fn projection<C: Component>(&self, slot: usize) -> EntityId {
        self.record.projections[slot].unwrap_or_else(|| {
            unreachable!(
                "matched entity lacks a projection for the owner of `{}`",
                std::any::type_name::<C>(),
            )
        })
    }
}

impl<C: Component> QueryData for &C {
    type Guards<'w> = (usize, AtomicRef<'w, SegmentedMap<EntityId, C>>);
    type Item<'g> = &'g C;

    fn components(out: &mut Vec<ComponentInfo>) {
        out.push(ComponentInfo::of::<C>());
    }

    fn acquire<'w>(source: &QuerySource<'w>) -> Self::Guards<'w> {
        let (slot, column) = source.storage_column::<C>();
        let storage = AtomicRef::map(column.borrow(), |storage| {
            storage
                .as_any()
                .downcast_ref::<SegmentedMap<EntityId, C>>()
                .expect("storage column holds its declared component type")
        });

        (slot, storage)
    }

    fn get<'g>(
        guards: &'g mut Self::Guards<'_>,
        entity: EntityView<'_>,
    ) -> Self::Item<'g> {
        let projection = entity.projection::<C>(guards.0);

        guards.1.get(&projection).unwrap_or_else(|| {
            unreachable!("matched entities have their signature's components")
        })
    }
}

impl<C: Component> QueryData for &mut C {
    type Guards<'w> = (usize, AtomicRefMut<'w, SegmentedMap<EntityId, C>>);
    type Item<'g> = &'g mut C;

    fn components(out: &mut Vec<ComponentInfo>) {
        out.push(ComponentInfo::of::<C>());
    }

    fn acquire<'w>(source: &QuerySource<'w>) -> Self::Guards<'w> {
        let (slot, column) = source.storage_column::<C>();
        let storage = AtomicRefMut::map(column.borrow_mut(), |storage| {
            storage
                .as_any_mut()
                .downcast_mut::<SegmentedMap<EntityId, C>>()
                .expect("storage column holds its declared component type")
        });

        (slot, storage)
    }

    fn get<'g>(
        guards: &'g mut Self::Guards<'_>,
        entity: EntityView<'_>,
    ) -> Self::Item<'g> {
        let projection = entity.projection::<C>(guards.0);

        guards.1.get_mut(&projection).unwrap_or_else(|| {
            unreachable!("matched entities have their signature's components")
        })
    }
}

impl QueryData for EntityId {
    type Guards<'w> = ();
    type Item<'g> = EntityId;

    fn components(_out: &mut Vec<ComponentInfo>) {}

    fn acquire<'w>(_source: &QuerySource<'w>) -> Self::Guards<'w> {}

    fn get<'g>(
        _guards: &'g mut Self::Guards<'_>,
        entity: EntityView<'_>,
    ) -> Self::Item<'g> {
        entity.record.id
    }
}

impl QueryData for EntityHandle {
    type Guards<'w> = ();
    type Item<'g> = EntityHandle;

    fn components(_out: &mut Vec<ComponentInfo>) {}

    fn acquire<'w>(_source: &QuerySource<'w>) -> Self::Guards<'w> {}

    fn get<'g>(
        _guards: &'g mut Self::Guards<'_>,
        entity: EntityView<'_>,
    ) -> Self::Item<'g> {
        EntityHandle {
            cell: Arc::downgrade(entity.cell),
            id: entity.record.id,
        }
    }
}

impl<M: Schema> Manager<M> {
    /// Runs `f` for every live entity whose signature is a superset of the
    /// queried components, in ascending local id order.
    ///
    /// The query signature is the union of `D`'s and `F`'s components. The
    /// scan is dispatched to the most-base manager of the composition whose
    /// vocabulary still covers the signature, so entities created in derived
    /// managers are visited through their projections.
    ///
    /// While the scan runs, the queried storage columns and the scanned
    /// entity vector are borrowed: the callback may read *other* components
    /// through [`entity`](Manager::entity), but structural mutation must be
    /// deferred through a [`CommandQueue`](crate::CommandQueue) and applied
    /// after the scan. Entities spawned by deferred commands are therefore
    /// not visited by the scan that queued them.
    ///
    /// # Panics
    ///
    /// Panics if the signature names a component outside this manager's
    /// vocabulary, if `D` fetches a tag component, or if `D` borrows the
    /// same component conflictingly.
    pub fn for_each_matching<D: QueryData, F: QueryFilter>(
        &self,
        mut f: impl FnMut(D::Item<'_>),
    ) {
        let mut wanted = Vec::new();

        D::components(&mut wanted);
        F::components(&mut wanted);

        for info in &wanted {
            if self.blueprint.index_of(info.type_id()).is_none() {
                panic!(
                    "component `{info}` is not in the vocabulary of manager \
                     `{}`",
                    self.blueprint.name(),
                );
            }
        }

        let base = self.blueprint.find_most_base(&wanted);
        let base_domain: Vec<Arc<ManagerCell>> = base
            .managers()
            .iter()
            .map(|id| {
                let slot = self.blueprint.manager_slot(*id).unwrap_or_else(
                    || unreachable!("base closures are subsets of derived ones"),
                );

                Arc::clone(&self.domain[slot])
            })
            .collect();
        let signature = base.signature_of(&wanted);
        let source = QuerySource { domain: &base_domain, blueprint: base };
        let mut guards = D::acquire(&source);
        let base_cell = &base_domain[base.self_slot()];
        let core = base_cell.core.borrow();

        log::trace!(
            "query over {} components dispatched from `{}` to `{}`",
            wanted.len(),
            self.blueprint.name(),
            base.name(),
        );

        for record in &core.entities {
            if !record.live || !record.signature.contains_all(&signature) {
                continue;
            }

            f(D::get(&mut guards, EntityView { cell: base_cell, record }));
        }
    }
}
