use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use atomic_refcell::{AtomicRef, AtomicRefMut};

use super::{EntityHandle, EntityId};
use crate::component::{Component, ComponentNotFound};
use crate::manager::Manager;
use crate::schema::Schema;
use crate::storage::SegmentedMap;

/// A borrow of one entity of a [`Manager`].
///
/// Obtained from [`Manager::entity`]; component accesses resolve through the
/// owning manager of the requested component, which may be a base.
pub struct EntityRef<'m, M: Schema> {
    pub(crate) manager: &'m Manager<M>,
    pub(crate) entity: EntityId,
}

/// A shared borrow of one component value.
pub struct ComponentRef<'w, C> {
    pub(crate) inner: AtomicRef<'w, C>,
}

/// A mutable borrow of one component value.
pub struct ComponentMut<'w, C> {
    pub(crate) inner: AtomicRefMut<'w, C>,
}

impl<'m, M: Schema> EntityRef<'m, M> {
    /// The id of this entity.
    pub fn id(&self) -> EntityId {
        self.entity
    }

    /// Returns a handle to this entity usable outside the manager borrow.
    pub fn handle(&self) -> EntityHandle {
        let cell = Arc::downgrade(self.manager.cell());

        EntityHandle { cell, id: self.entity }
    }

    /// Returns `true` if the entity possesses the component.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not in the manager's vocabulary.
    pub fn contains<C: Component>(&self) -> bool {
        let index = self.manager.blueprint.component_id::<C>();
        let core = self.manager.cell().core.borrow();
        let record = &core.entities[self.entity.index()];

        // records destroyed through another manager of the domain read as
        // absent
        record.live && record.signature.test(index)
    }

    /// The amount of components the entity possesses.
    pub fn component_count(&self) -> usize {
        let core = self.manager.cell().core.borrow();
        let record = &core.entities[self.entity.index()];

        if record.live {
            record.signature.count_ones()
        } else {
            0
        }
    }

    /// Borrows a storage component of the entity.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a storage component of the manager's vocabulary,
    /// or if the component is mutably borrowed (for example by a query that
    /// is currently scanning).
    pub fn get<C: Component>(
        &self,
    ) -> Result<ComponentRef<'m, C>, ComponentNotFound> {
        let (slot, storage_index) = self.storage_location::<C>();
        let projection = self
            .projection(slot)
            .ok_or_else(|| ComponentNotFound::new::<C>(self.entity))?;
        let storage = AtomicRef::map(
            self.manager.domain[slot].storages[storage_index].borrow(),
            |storage| {
                storage
                    .as_any()
                    .downcast_ref::<SegmentedMap<EntityId, C>>()
                    .expect("storage column holds its declared component type")
            },
        );

        if !storage.contains(&projection) {
            return Err(ComponentNotFound::new::<C>(self.entity));
        }

        let inner = AtomicRef::map(storage, |storage| {
            storage.get(&projection).expect("checked under the same borrow")
        });

        Ok(ComponentRef { inner })
    }

    /// Mutably borrows a storage component of the entity.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`get`](Self::get).
    pub fn get_mut<C: Component>(
        &self,
    ) -> Result<ComponentMut<'m, C>, ComponentNotFound> {
        let (slot, storage_index) = self.storage_location::<C>();
        let projection = self
            .projection(slot)
            .ok_or_else(|| ComponentNotFound::new::<C>(self.entity))?;
        let storage = AtomicRefMut::map(
            self.manager.domain[slot].storages[storage_index].borrow_mut(),
            |storage| {
                storage
                    .as_any_mut()
                    .downcast_mut::<SegmentedMap<EntityId, C>>()
                    .expect("storage column holds its declared component type")
            },
        );

        if !storage.contains(&projection) {
            return Err(ComponentNotFound::new::<C>(self.entity));
        }

        let inner = AtomicRefMut::map(storage, |storage| {
            storage
                .get_mut(&projection)
                .expect("checked under the same borrow")
        });

        Ok(ComponentMut { inner })
    }

    fn storage_location<C: Component>(&self) -> (usize, usize) {
        let meta = self.manager.blueprint.expect_meta::<C>();
        let Some(storage_index) = meta.owner_storage_index else {
            panic!(
                "tag component `{}` carries no data",
                std::any::type_name::<C>(),
            );
        };

        (meta.owner_slot, storage_index)
    }

    fn projection(&self, slot: usize) -> Option<EntityId> {
        let core = self.manager.cell().core.borrow();
        let record = core.entities.get(self.entity.index())?;

        if !record.live {
            return None;
        }

        record.projections[slot]
    }
}

impl<M: Schema> Clone for EntityRef<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Schema> Copy for EntityRef<'_, M> {}

impl<M: Schema> fmt::Debug for EntityRef<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.entity).finish()
    }
}

impl<C> Deref for ComponentRef<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C> Deref for ComponentMut<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C> DerefMut for ComponentMut<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: fmt::Debug> fmt::Debug for ComponentRef<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<C: fmt::Debug> fmt::Debug for ComponentMut<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}
