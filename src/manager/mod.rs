//! Defines [`Manager`], a statically-composed shard of the ECS.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

pub use self::bases::*;
pub(crate) use self::cell::*;
use crate::bundle::{Bundle, BundleWriter};
use crate::component::{Component, ComponentInfo};
use crate::entity::{EntityHandle, EntityId, EntityNotFound, EntityRecord, EntityRef};
use crate::schema::{Blueprint, Schema};

mod bases;
mod cell;
#[cfg(test)]
mod tests;

/// A statically-composed shard of the ECS.
///
/// A manager owns the storage for its locally-declared components and an
/// entity vector. Managers compose: a derived manager shares the cells of its
/// (transitive) bases, and entities created here materialize projection
/// records in every base manager that owns one of their storage components.
///
/// Managers are single-threaded mutable domains; component borrows are
/// checked at runtime and conflicting access panics.
pub struct Manager<M: Schema> {
    pub(crate) blueprint: &'static Blueprint,
    /// Cells of every manager in the closure, in closure order, own cell
    /// last. Holding these keeps base managers alive.
    pub(crate) domain: Vec<Arc<ManagerCell>>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Schema> Manager<M> {
    /// Creates a manager, wiring it to its direct bases.
    ///
    /// `bases` is one `&Manager<B>` per direct base of the schema, in
    /// declaration order (a tuple; root managers pass `()`). Every indirect
    /// base is resolved through the leftmost direct base that reaches it.
    ///
    /// # Panics
    ///
    /// Panics if the supplied bases do not match the schema's declaration,
    /// and propagates blueprint construction panics (duplicate components,
    /// cyclic composition).
    pub fn new(bases: impl BaseSet) -> Self {
        let blueprint = M::blueprint();
        let supplied = bases.collect();
        let declared = blueprint.direct_bases();

        if supplied.len() != declared.len() {
            panic!(
                "manager `{}` declares {} direct bases, {} were supplied",
                blueprint.name(),
                declared.len(),
                supplied.len(),
            );
        }

        for (index, (base, declared)) in
            supplied.iter().zip(declared.iter()).enumerate()
        {
            if base.blueprint.schema() != declared.schema() {
                panic!(
                    "manager `{}` expected base `{}` at position {index}, got \
                     `{}`",
                    blueprint.name(),
                    declared.name(),
                    base.blueprint.name(),
                );
            }
        }

        let mut domain = Vec::with_capacity(blueprint.num_managers());

        for slot in 0..blueprint.self_slot() {
            let id = blueprint.managers()[slot];
            let mut resolved: Option<Arc<ManagerCell>> = None;

            // the leftmost direct base reaching an indirect base supplies its
            // cell; divergent instances elsewhere in a diamond are ignored
            for base in &supplied {
                let Some(base_slot) = base.blueprint.manager_slot(id) else {
                    continue;
                };
                let cell = &base.domain[base_slot];

                match &resolved {
                    None => resolved = Some(Arc::clone(cell)),
                    Some(first) => {
                        if !Arc::ptr_eq(first, cell) {
                            log::warn!(
                                "manager `{}`: base `{id}` is reachable \
                                 through several instances; using the \
                                 leftmost",
                                blueprint.name(),
                            );
                        }
                    }
                }
            }

            domain.push(resolved.unwrap_or_else(|| {
                unreachable!("every indirect base is reachable from a direct one")
            }));
        }

        let cell = ManagerCell::new(blueprint);

        domain.push(cell);

        let weaks: Box<[Weak<ManagerCell>]> =
            domain.iter().map(Arc::downgrade).collect();

        domain[blueprint.self_slot()]
            .domain
            .set(weaks)
            .unwrap_or_else(|_| unreachable!("cells are wired exactly once"));

        log::debug!(
            "wired manager `{}` over {} base cells",
            blueprint.name(),
            blueprint.num_managers() - 1,
        );

        Self { blueprint, domain, _marker: PhantomData }
    }

    /// The flattened composition of this manager's schema.
    pub fn blueprint(&self) -> &'static Blueprint {
        self.blueprint
    }

    pub(crate) fn cell(&self) -> &Arc<ManagerCell> {
        &self.domain[self.blueprint.self_slot()]
    }

    /// The amount of live entity records in this manager, projections
    /// included.
    pub fn len(&self) -> usize {
        let core = self.cell().core.borrow();

        core.entities.len() - core.free_slots.len()
    }

    /// Returns `true` if this manager has no live entity records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this manager contains the entity.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.cell()
            .core
            .borrow()
            .entities
            .get(entity.index())
            .is_some_and(|record| record.live)
    }

    /// The amount of retired slots in this manager's free-slot queue.
    pub fn free_slot_count(&self) -> usize {
        self.cell().core.borrow().free_slots.len()
    }

    /// Creates an entity from a [`Bundle`] of component values.
    ///
    /// The bundle's component list is the entity's signature. A projection
    /// record is created in every base manager owning one of the bundle's
    /// storage components, and the signature (restricted to each base's
    /// vocabulary) is propagated into the projections so queries dispatched
    /// to a base still match the entity.
    ///
    /// # Panics
    ///
    /// Panics if the bundle repeats a component or names one outside this
    /// manager's vocabulary.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let mut infos = Vec::new();

        B::components(&mut infos);

        for (index, info) in infos.iter().enumerate() {
            if infos[..index].contains(info) {
                panic!(
                    "duplicate component `{info}` in bundle spawned in \
                     manager `{}`",
                    self.blueprint.name(),
                );
            }
        }

        let signature = self.blueprint.signature_of(&infos);
        let entity = {
            let mut core = self.cell().core.borrow_mut();
            let id = EntityId::from_index(core.entities.len());
            let mut projections =
                vec![None; self.blueprint.num_managers()].into_boxed_slice();

            projections[self.blueprint.self_slot()] = Some(id);

            core.entities.push(EntityRecord {
                id,
                signature,
                projections,
                origin: None,
                live: true,
            });

            id
        };

        let mut writer = BundleWriter {
            domain: &self.domain,
            blueprint: self.blueprint,
            root: entity,
        };

        bundle.write(&mut writer);

        self.wire_projections(entity, &infos);

        log::trace!(
            "spawned entity {} in `{}`",
            entity.index(),
            self.blueprint.name(),
        );

        entity
    }

    /// Completes the projection records of a freshly-spawned entity: links
    /// every projection to its siblings in its own closure, and propagates
    /// the base-visible part of the signature.
    fn wire_projections(&self, entity: EntityId, infos: &[ComponentInfo]) {
        let self_slot = self.blueprint.self_slot();
        let projections =
            self.cell().core.borrow().entities[entity.index()].projections.clone();

        for slot in 0..self_slot {
            let Some(projection) = projections[slot] else {
                continue;
            };
            let base_cell = &self.domain[slot];
            let base_blueprint = base_cell.blueprint;
            let mut core = base_cell.core.borrow_mut();
            let record = &mut core.entities[projection.index()];

            for (base_slot, id) in base_blueprint
                .managers()
                .iter()
                .enumerate()
                .take(base_blueprint.self_slot())
            {
                let slot_here = self
                    .blueprint
                    .manager_slot(*id)
                    .unwrap_or_else(|| {
                        unreachable!("base closures are subsets of derived ones")
                    });

                record.projections[base_slot] = projections[slot_here];
            }

            for info in infos {
                if let Some(index) = base_blueprint.index_of(info.type_id()) {
                    record.signature.set(index);
                }
            }
        }
    }

    /// Borrows an entity of this manager.
    pub fn entity(
        &self,
        entity: EntityId,
    ) -> Result<EntityRef<'_, M>, EntityNotFound> {
        if !self.contains(entity) {
            return Err(EntityNotFound(entity));
        }

        Ok(EntityRef { manager: self, entity })
    }

    /// Destroys an entity of this manager.
    ///
    /// If the id names a projection record, the whole entity is destroyed
    /// through its creating manager. Every stored component is erased from
    /// its owner's storage and every projection's id is pushed onto its
    /// manager's free-slot queue.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EntityNotFound> {
        despawn_in(self.cell(), entity)
    }

    /// Destroys the entity referenced by a handle.
    ///
    /// The handle may name a record of this manager or of any of its bases
    /// (for example one captured from a query dispatched below this
    /// manager).
    pub fn despawn_handle(
        &mut self,
        entity: &EntityHandle,
    ) -> Result<(), EntityNotFound> {
        let cell =
            entity.cell.upgrade().ok_or(EntityNotFound(entity.id))?;

        despawn_in(&cell, entity.id)
    }

    /// The amount of values currently stored for `C` in its owner's storage
    /// column.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a storage component of this manager's
    /// vocabulary.
    pub fn stored<C: Component>(&self) -> usize {
        let meta = self.blueprint.expect_meta::<C>();
        let Some(storage_index) = meta.owner_storage_index else {
            panic!(
                "tag component `{}` carries no data",
                std::any::type_name::<C>(),
            );
        };
        let cell = self.cell().domain_cell(meta.owner_slot);
        let len = cell.storages[storage_index].borrow().len();
        len
    }

    /// The ids of this manager that have had `C` inserted, in insertion
    /// order.
    ///
    /// The log is append-only: destruction does not compact it.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not in this manager's vocabulary.
    pub fn component_entities<C: Component>(&self) -> Vec<EntityId> {
        let meta = self.blueprint.expect_meta::<C>();
        let cell = self.cell().domain_cell(meta.owner_slot);
        let core = cell.core.borrow();

        core.component_entities[meta.owner_my_index].clone()
    }
}

/// Destroys the entity that `entity` names in `cell`, resolving projection
/// records to their creating manager first.
pub(crate) fn despawn_in(
    cell: &Arc<ManagerCell>,
    entity: EntityId,
) -> Result<(), EntityNotFound> {
    let origin = {
        let core = cell.core.borrow();
        let record = core
            .entities
            .get(entity.index())
            .filter(|record| record.live)
            .ok_or(EntityNotFound(entity))?;

        record.origin.clone()
    };

    match origin {
        Some(origin) => {
            let root =
                origin.cell.upgrade().ok_or(EntityNotFound(entity))?;

            teardown(&root, origin.id)
        }
        None => teardown(cell, entity),
    }
}

/// Tears down a root record: erases its stored components from their owning
/// managers and retires every projection.
fn teardown(
    cell: &Arc<ManagerCell>,
    root: EntityId,
) -> Result<(), EntityNotFound> {
    let blueprint = cell.blueprint;
    let (signature, projections) = {
        let core = cell.core.borrow();
        let record = core
            .entities
            .get(root.index())
            .filter(|record| record.live)
            .ok_or(EntityNotFound(root))?;

        (record.signature.clone(), record.projections.clone())
    };

    for index in signature.ones() {
        let meta = blueprint.meta_at(index);
        let Some(storage_index) = meta.owner_storage_index else {
            // tags are signature-only
            continue;
        };
        let projection = projections[meta.owner_slot].unwrap_or_else(|| {
            unreachable!("stored components always have an owner projection")
        });
        let owner = cell.domain_cell(meta.owner_slot);

        owner.storages[storage_index].borrow_mut().erase(projection);
    }

    for (slot, projection) in projections.iter().enumerate() {
        let Some(projection) = *projection else {
            continue;
        };
        let owner = cell.domain_cell(slot);
        let mut core = owner.core.borrow_mut();

        core.entities[projection.index()].live = false;
        core.free_slots.push_back(projection);
    }

    log::trace!(
        "despawned entity {} from `{}`",
        root.index(),
        blueprint.name(),
    );

    Ok(())
}
