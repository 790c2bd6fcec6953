use std::collections::VecDeque;
use std::sync::{Arc, OnceLock, Weak};

use atomic_refcell::AtomicRefCell;

use crate::entity::{EntityId, EntityRecord};
use crate::schema::Blueprint;
use crate::storage::ErasedStorage;

/// The state of one manager, shared between it and every derived manager
/// that composes it.
///
/// The entity plane lives behind one cell, each storage column behind its
/// own, so distinct components can be borrowed independently (queries hold
/// column borrows while scanning the entity vector).
pub(crate) struct ManagerCell {
    pub(crate) blueprint: &'static Blueprint,
    /// Weak links to the cells of every manager of the closure, in closure
    /// order, self last. Wired once at construction; kept weak because the
    /// last slot refers back to this cell.
    pub(crate) domain: OnceLock<Box<[Weak<ManagerCell>]>>,
    pub(crate) core: AtomicRefCell<ManagerCore>,
    /// One column per local storage component, declaration order.
    pub(crate) storages: Box<[AtomicRefCell<Box<dyn ErasedStorage>>]>,
}

/// The entity plane of a manager.
pub(crate) struct ManagerCore {
    pub(crate) entities: Vec<EntityRecord>,
    /// Local ids of destroyed records, in destruction order. Recorded for
    /// later reuse; the current allocator always appends.
    pub(crate) free_slots: VecDeque<EntityId>,
    /// Per local component, every id that has had the component inserted.
    /// Append-only; not compacted by destruction.
    pub(crate) component_entities: Vec<Vec<EntityId>>,
}

impl ManagerCell {
    pub(crate) fn new(blueprint: &'static Blueprint) -> Arc<Self> {
        let storages = blueprint
            .my_storage_components()
            .iter()
            .map(|info| AtomicRefCell::new(info.new_storage()))
            .collect();
        let core = AtomicRefCell::new(ManagerCore {
            entities: Vec::new(),
            free_slots: VecDeque::new(),
            component_entities: vec![
                Vec::new();
                blueprint.num_my_components()
            ],
        });

        Arc::new(Self { blueprint, domain: OnceLock::new(), core, storages })
    }

    /// The cell of the manager at a closure slot.
    pub(crate) fn domain_cell(self: &Arc<Self>, slot: usize) -> Arc<ManagerCell> {
        if slot == self.blueprint.self_slot() {
            return Arc::clone(self);
        }

        self.domain
            .get()
            .and_then(|domain| domain[slot].upgrade())
            .unwrap_or_else(|| {
                unreachable!(
                    "base manager cells outlive managers that compose them"
                )
            })
    }
}
