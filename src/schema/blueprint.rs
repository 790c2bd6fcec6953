use std::any::TypeId;
use std::cell::RefCell;
use std::hash::BuildHasherDefault;
use std::sync::LazyLock;

use dashmap::DashMap;

use super::{Schema, SchemaDef, SchemaId};
use crate::component::{Component, ComponentInfo};
use crate::signature::Signature;
use crate::storage::{IndexTypeMap, TypeIdHasher};

/// The flattened composition of one manager schema.
///
/// Built once per schema type and memoized for the lifetime of the process.
/// Carries the manager's local and inherited component vocabulary, the
/// transitive base closure, the storage/tag partition and, for every
/// component, its owning manager.
pub struct Blueprint {
    schema: SchemaId,
    my_components: Vec<ComponentInfo>,
    my_storage_components: Vec<ComponentInfo>,
    my_tag_components: Vec<ComponentInfo>,
    direct_bases: Vec<&'static Blueprint>,
    /// Transitive base closure in first-occurrence order, this schema last.
    managers: Vec<SchemaId>,
    /// Blueprints of `managers[..managers.len() - 1]`.
    base_blueprints: Vec<&'static Blueprint>,
    /// The full vocabulary: inherited components first, local last.
    components: Vec<ComponentMeta>,
    /// Indices into `components`, storage components only, order preserved.
    storage_order: Vec<usize>,
    /// Indices into `components`, tag components only, order preserved.
    tag_order: Vec<usize>,
    component_indices: IndexTypeMap<usize>,
    manager_slots: IndexTypeMap<usize>,
}

/// Per-component composition data.
pub(crate) struct ComponentMeta {
    pub(crate) info: ComponentInfo,
    /// Index of the owning manager in `managers`.
    pub(crate) owner_slot: usize,
    /// Index within the owner's local components.
    pub(crate) owner_my_index: usize,
    /// Index within the owner's local storage components; `None` for tags.
    pub(crate) owner_storage_index: Option<usize>,
}

static BLUEPRINTS: LazyLock<
    DashMap<TypeId, &'static Blueprint, BuildHasherDefault<TypeIdHasher>>,
> = LazyLock::new(Default::default);

thread_local! {
    /// Schemas whose blueprints are mid-construction, for cycle detection.
    static IN_PROGRESS: RefCell<Vec<SchemaId>> = const { RefCell::new(Vec::new()) };
}

/// Pops the in-progress stack even if construction panics.
struct InProgressGuard;

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Blueprint {
    /// Returns the blueprint of the given schema, building it on first use.
    ///
    /// # Panics
    ///
    /// Panics if the schema declares a duplicate local component or if the
    /// composition graph contains a cycle.
    pub fn of<M: Schema>() -> &'static Blueprint {
        let type_id = TypeId::of::<M>();

        if let Some(existing) = BLUEPRINTS.get(&type_id) {
            return *existing;
        }

        let schema = SchemaId::of::<M>();

        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.contains(&schema) {
                let chain = stack
                    .iter()
                    .map(SchemaId::name)
                    .chain([schema.name()])
                    .collect::<Vec<_>>()
                    .join(" -> ");

                panic!("cyclic manager composition: {chain}");
            }

            stack.push(schema);
        });

        let blueprint = {
            let _guard = InProgressGuard;
            let mut def = SchemaDef::new(schema);

            M::define(&mut def);

            Box::leak(Box::new(Self::build(def)))
        };

        *BLUEPRINTS.entry(type_id).or_insert(blueprint)
    }

    fn build(def: SchemaDef) -> Self {
        let SchemaDef { schema, components: my_components, bases: direct_bases } =
            def;

        for (index, info) in my_components.iter().enumerate() {
            if my_components[..index].contains(info) {
                panic!(
                    "duplicate component `{info}` declared by manager \
                     `{schema}`",
                );
            }
        }

        let my_storage_components: Vec<_> = my_components
            .iter()
            .copied()
            .filter(ComponentInfo::is_storage)
            .collect();
        let my_tag_components: Vec<_> = my_components
            .iter()
            .copied()
            .filter(ComponentInfo::is_tag)
            .collect();

        // transitive base closure, first occurrence wins, this schema last
        let mut managers = Vec::new();
        let mut base_blueprints: Vec<&'static Blueprint> = Vec::new();

        for base in &direct_bases {
            for slot in 0..base.managers.len() {
                let id = base.managers[slot];

                if !managers.contains(&id) {
                    managers.push(id);
                    base_blueprints.push(base.blueprint_at(slot));
                }
            }
        }

        managers.push(schema);

        let mut manager_slots = IndexTypeMap::default();

        for (slot, id) in managers.iter().enumerate() {
            manager_slots.insert(id.type_id(), slot);
        }

        // component universe: inherited first, local appended, deduplicated
        let mut infos: Vec<ComponentInfo> = Vec::new();

        for base in &direct_bases {
            for meta in &base.components {
                if !infos.contains(&meta.info) {
                    infos.push(meta.info);
                }
            }
        }

        for info in &my_components {
            if !infos.contains(info) {
                infos.push(*info);
            }
        }

        // the owner of a component is the first manager of the closure that
        // declares it locally
        let components: Vec<ComponentMeta> = infos
            .iter()
            .map(|info| {
                for (owner_slot, base) in base_blueprints.iter().enumerate() {
                    if let Some(owner_my_index) =
                        base.my_components.iter().position(|c| c == info)
                    {
                        let owner_storage_index = base
                            .my_storage_components
                            .iter()
                            .position(|c| c == info);

                        return ComponentMeta {
                            info: *info,
                            owner_slot,
                            owner_my_index,
                            owner_storage_index,
                        };
                    }
                }

                let owner_my_index = my_components
                    .iter()
                    .position(|c| c == info)
                    .unwrap_or_else(|| {
                        unreachable!(
                            "component `{info}` has no declaring manager"
                        )
                    });
                let owner_storage_index =
                    my_storage_components.iter().position(|c| c == info);

                ComponentMeta {
                    info: *info,
                    owner_slot: managers.len() - 1,
                    owner_my_index,
                    owner_storage_index,
                }
            })
            .collect();

        let storage_order: Vec<_> = components
            .iter()
            .enumerate()
            .filter(|(_, meta)| meta.info.is_storage())
            .map(|(index, _)| index)
            .collect();
        let tag_order: Vec<_> = components
            .iter()
            .enumerate()
            .filter(|(_, meta)| meta.info.is_tag())
            .map(|(index, _)| index)
            .collect();

        let mut component_indices = IndexTypeMap::default();

        for (index, meta) in components.iter().enumerate() {
            component_indices.insert(meta.info.type_id(), index);
        }

        log::debug!(
            "composed manager `{schema}`: {} components ({} storage, {} tag) \
             across {} managers",
            components.len(),
            storage_order.len(),
            tag_order.len(),
            managers.len(),
        );

        Self {
            schema,
            my_components,
            my_storage_components,
            my_tag_components,
            direct_bases,
            managers,
            base_blueprints,
            components,
            storage_order,
            tag_order,
            component_indices,
            manager_slots,
        }
    }

    // identity ---

    /// The schema this blueprint was built from.
    pub fn schema(&self) -> SchemaId {
        self.schema
    }

    /// The schema's type name.
    pub fn name(&self) -> &'static str {
        self.schema.name()
    }

    // counts ---

    /// The amount of components in the full vocabulary.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// The amount of locally declared components.
    pub fn num_my_components(&self) -> usize {
        self.my_components.len()
    }

    /// The amount of storage components in the full vocabulary.
    pub fn num_storage_components(&self) -> usize {
        self.storage_order.len()
    }

    /// The amount of tag components in the full vocabulary.
    pub fn num_tag_components(&self) -> usize {
        self.tag_order.len()
    }

    /// The amount of managers in the closure, this one included.
    pub fn num_managers(&self) -> usize {
        self.managers.len()
    }

    /// The amount of direct bases.
    pub fn num_bases(&self) -> usize {
        self.direct_bases.len()
    }

    // sequences ---

    /// The locally declared components, declaration order.
    pub fn my_components(&self) -> &[ComponentInfo] {
        &self.my_components
    }

    /// The locally declared storage components, declaration order.
    pub fn my_storage_components(&self) -> &[ComponentInfo] {
        &self.my_storage_components
    }

    /// The locally declared tag components, declaration order.
    pub fn my_tag_components(&self) -> &[ComponentInfo] {
        &self.my_tag_components
    }

    /// The full component vocabulary: inherited components first, local last,
    /// deduplicated keeping the first occurrence.
    pub fn components(&self) -> impl Iterator<Item = ComponentInfo> + '_ {
        self.components.iter().map(|meta| meta.info)
    }

    /// The storage components of the full vocabulary, order preserved.
    pub fn storage_components(
        &self,
    ) -> impl Iterator<Item = ComponentInfo> + '_ {
        self.storage_order.iter().map(|&index| self.components[index].info)
    }

    /// The tag components of the full vocabulary, order preserved.
    pub fn tag_components(&self) -> impl Iterator<Item = ComponentInfo> + '_ {
        self.tag_order.iter().map(|&index| self.components[index].info)
    }

    /// The manager closure: transitive bases in first-occurrence order, this
    /// manager last.
    pub fn managers(&self) -> &[SchemaId] {
        &self.managers
    }

    // membership ---

    /// Returns `true` if `C` is in the full vocabulary.
    pub fn is_component<C: Component>(&self) -> bool {
        self.component_indices.contains_key(&TypeId::of::<C>())
    }

    /// Returns `true` if `C` is declared locally.
    pub fn is_my_component<C: Component>(&self) -> bool {
        self.my_components.contains(&ComponentInfo::of::<C>())
    }

    /// Returns `true` if `C` is a storage component of the full vocabulary.
    pub fn is_storage_component<C: Component>(&self) -> bool {
        self.index_of(TypeId::of::<C>())
            .is_some_and(|index| self.components[index].info.is_storage())
    }

    /// Returns `true` if `C` is a tag component of the full vocabulary.
    pub fn is_tag_component<C: Component>(&self) -> bool {
        self.index_of(TypeId::of::<C>())
            .is_some_and(|index| self.components[index].info.is_tag())
    }

    /// Returns `true` if every given component is in the full vocabulary.
    pub fn covers(&self, components: &[ComponentInfo]) -> bool {
        components
            .iter()
            .all(|info| self.component_indices.contains_key(&info.type_id()))
    }

    // indices ---

    /// The index of `C` within the full vocabulary.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not in the vocabulary.
    pub fn component_id<C: Component>(&self) -> usize {
        self.index_of(TypeId::of::<C>())
            .unwrap_or_else(|| self.unknown_component::<C>())
    }

    /// The index of `C` within the locally declared components.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not declared locally.
    pub fn my_component_id<C: Component>(&self) -> usize {
        let info = ComponentInfo::of::<C>();

        self.my_components
            .iter()
            .position(|c| *c == info)
            .unwrap_or_else(|| self.unknown_component::<C>())
    }

    /// The index of `C` within the storage components of the full vocabulary.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a storage component of the vocabulary.
    pub fn storage_component_id<C: Component>(&self) -> usize {
        self.index_of(TypeId::of::<C>())
            .and_then(|index| {
                self.storage_order.iter().position(|&i| i == index)
            })
            .unwrap_or_else(|| self.unknown_component::<C>())
    }

    /// The index of `C` within the locally declared storage components.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a local storage component.
    pub fn my_storage_component_id<C: Component>(&self) -> usize {
        let info = ComponentInfo::of::<C>();

        self.my_storage_components
            .iter()
            .position(|c| *c == info)
            .unwrap_or_else(|| self.unknown_component::<C>())
    }

    /// The index of `C` within the tag components of the full vocabulary.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not a tag component of the vocabulary.
    pub fn tag_component_id<C: Component>(&self) -> usize {
        self.index_of(TypeId::of::<C>())
            .and_then(|index| self.tag_order.iter().position(|&i| i == index))
            .unwrap_or_else(|| self.unknown_component::<C>())
    }

    /// The index of manager `B` within the closure.
    ///
    /// # Panics
    ///
    /// Panics if `B` is not in the closure.
    pub fn manager_id<B: Schema>(&self) -> usize {
        self.manager_slots.get(&TypeId::of::<B>()).copied().unwrap_or_else(
            || {
                panic!(
                    "manager `{}` is not a base of manager `{}`",
                    SchemaId::of::<B>(),
                    self.schema,
                )
            },
        )
    }

    /// The manager of the closure that locally declares `C`.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not in the vocabulary.
    pub fn owner_of<C: Component>(&self) -> SchemaId {
        let index = self
            .index_of(TypeId::of::<C>())
            .unwrap_or_else(|| self.unknown_component::<C>());

        self.managers[self.components[index].owner_slot]
    }

    // dispatch ---

    /// The leftmost direct base whose vocabulary covers the given components,
    /// or this manager if none does.
    pub fn find_direct_base(
        &'static self,
        components: &[ComponentInfo],
    ) -> &'static Blueprint {
        self.direct_bases
            .iter()
            .copied()
            .find(|base| base.covers(components))
            .unwrap_or(self)
    }

    /// The fixed point of [`find_direct_base`](Self::find_direct_base): the
    /// most-base manager of the composition whose vocabulary still covers the
    /// given components.
    pub fn find_most_base(
        &'static self,
        components: &[ComponentInfo],
    ) -> &'static Blueprint {
        let mut current = self;

        loop {
            let next = current.find_direct_base(components);

            if next.schema == current.schema {
                return current;
            }

            current = next;
        }
    }

    // crate internals ---

    pub(crate) fn index_of(&self, type_id: TypeId) -> Option<usize> {
        self.component_indices.get(&type_id).copied()
    }

    pub(crate) fn meta(&self, type_id: TypeId) -> Option<&ComponentMeta> {
        self.index_of(type_id).map(|index| &self.components[index])
    }

    /// Like [`meta`](Self::meta), panicking on components outside the
    /// vocabulary.
    pub(crate) fn expect_meta<C: Component>(&self) -> &ComponentMeta {
        self.meta(TypeId::of::<C>())
            .unwrap_or_else(|| self.unknown_component::<C>())
    }

    pub(crate) fn meta_at(&self, index: usize) -> &ComponentMeta {
        &self.components[index]
    }

    pub(crate) fn direct_bases(&self) -> &[&'static Blueprint] {
        &self.direct_bases
    }

    pub(crate) fn manager_slot(&self, schema: SchemaId) -> Option<usize> {
        self.manager_slots.get(&schema.type_id()).copied()
    }

    /// The blueprint of the manager at a closure slot.
    pub(crate) fn blueprint_at(&'static self, slot: usize) -> &'static Blueprint {
        if slot == self.managers.len() - 1 {
            self
        } else {
            self.base_blueprints[slot]
        }
    }

    /// The closure slot of this manager itself.
    pub(crate) fn self_slot(&self) -> usize {
        self.managers.len() - 1
    }

    /// Builds the runtime signature of a component list in this manager's
    /// vocabulary order.
    ///
    /// # Panics
    ///
    /// Panics if a component is not in the vocabulary.
    pub(crate) fn signature_of(&self, components: &[ComponentInfo]) -> Signature {
        let mut signature = Signature::empty(self.components.len());

        for info in components {
            let index = self.index_of(info.type_id()).unwrap_or_else(|| {
                panic!(
                    "component `{info}` is not in the vocabulary of manager \
                     `{}`",
                    self.schema,
                )
            });

            signature.set(index);
        }

        signature
    }

    fn unknown_component<C: Component>(&self) -> ! {
        panic!(
            "component `{}` is not in the vocabulary of manager `{}`",
            std::any::type_name::<C>(),
            self.schema,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[derive(Component)]
    struct Position(#[allow(dead_code)] f32);

    #[derive(Component)]
    struct Velocity(#[allow(dead_code)] f32);

    #[derive(Component)]
    struct Dead;

    #[derive(Schema)]
    #[schema(components(Position, Velocity))]
    struct Physics;

    #[derive(Schema)]
    #[schema(components(Dead), bases(Physics))]
    struct Gameplay;

    #[test]
    fn flattened_orders() {
        let blueprint = Gameplay::blueprint();

        assert_eq!(
            blueprint.managers(),
            [SchemaId::of::<Physics>(), SchemaId::of::<Gameplay>()],
        );
        assert_eq!(
            blueprint.components().collect::<Vec<_>>(),
            [
                ComponentInfo::of::<Position>(),
                ComponentInfo::of::<Velocity>(),
                ComponentInfo::of::<Dead>(),
            ],
        );
        assert_eq!(blueprint.num_managers(), 2);
        assert_eq!(blueprint.num_components(), 3);
        assert_eq!(blueprint.num_my_components(), 1);
    }

    #[test]
    fn storage_tag_partition() {
        let blueprint = Gameplay::blueprint();

        assert_eq!(
            blueprint.storage_components().collect::<Vec<_>>(),
            [ComponentInfo::of::<Position>(), ComponentInfo::of::<Velocity>()],
        );
        assert_eq!(
            blueprint.tag_components().collect::<Vec<_>>(),
            [ComponentInfo::of::<Dead>()],
        );

        assert!(blueprint.is_storage_component::<Position>());
        assert!(blueprint.is_tag_component::<Dead>());
        assert!(!blueprint.is_tag_component::<Position>());
    }

    #[test]
    fn component_indices() {
        let blueprint = Gameplay::blueprint();

        assert_eq!(blueprint.component_id::<Position>(), 0);
        assert_eq!(blueprint.component_id::<Velocity>(), 1);
        assert_eq!(blueprint.component_id::<Dead>(), 2);
        assert_eq!(blueprint.my_component_id::<Dead>(), 0);
        assert_eq!(blueprint.storage_component_id::<Velocity>(), 1);
        assert_eq!(blueprint.tag_component_id::<Dead>(), 0);
        assert_eq!(blueprint.manager_id::<Physics>(), 0);
        assert_eq!(blueprint.manager_id::<Gameplay>(), 1);
    }

    #[test]
    fn owners() {
        let blueprint = Gameplay::blueprint();

        assert_eq!(blueprint.owner_of::<Position>(), SchemaId::of::<Physics>());
        assert_eq!(blueprint.owner_of::<Dead>(), SchemaId::of::<Gameplay>());
    }

    #[test]
    #[should_panic(expected = "is not in the vocabulary")]
    fn unknown_component_is_rejected() {
        #[derive(Component)]
        struct Unrelated;

        Physics::blueprint().component_id::<Unrelated>();
    }

    #[test]
    fn base_components_are_inherited() {
        let blueprint = Gameplay::blueprint();

        assert!(blueprint.is_component::<Position>());
        assert!(!blueprint.is_my_component::<Position>());
        assert!(blueprint.is_my_component::<Dead>());

        // vocabularies of bases are subsets of vocabularies of derived
        // managers
        let physics = Physics::blueprint();

        assert!(blueprint
            .covers(&physics.components().collect::<Vec<_>>()));
    }

    #[test]
    fn signature_dispatch() {
        let blueprint = Gameplay::blueprint();
        let position_velocity =
            [ComponentInfo::of::<Position>(), ComponentInfo::of::<Velocity>()];
        let with_dead = [
            ComponentInfo::of::<Position>(),
            ComponentInfo::of::<Dead>(),
        ];

        assert_eq!(
            blueprint.find_most_base(&position_velocity).schema(),
            SchemaId::of::<Physics>(),
        );
        assert_eq!(
            blueprint.find_most_base(&with_dead).schema(),
            SchemaId::of::<Gameplay>(),
        );

        // the empty signature is covered by every base
        assert_eq!(
            blueprint.find_most_base(&[]).schema(),
            SchemaId::of::<Physics>(),
        );
    }

    #[test]
    fn diamonds_deduplicate() {
        #[derive(Schema)]
        #[schema(bases(Physics))]
        struct Left;

        #[derive(Schema)]
        #[schema(bases(Physics))]
        struct Right;

        #[derive(Schema)]
        #[schema(bases(Left, Right))]
        struct Diamond;

        let blueprint = Diamond::blueprint();

        assert_eq!(
            blueprint.managers(),
            [
                SchemaId::of::<Physics>(),
                SchemaId::of::<Left>(),
                SchemaId::of::<Right>(),
                SchemaId::of::<Diamond>(),
            ],
        );
        assert_eq!(blueprint.num_components(), 2);
    }

    #[test]
    fn leftmost_base_wins_dispatch() {
        #[derive(Component)]
        struct Shared(#[allow(dead_code)] u32);

        #[derive(Schema)]
        #[schema(components(Shared))]
        struct First;

        #[derive(Schema)]
        #[schema(components(Shared))]
        struct Second;

        #[derive(Schema)]
        #[schema(bases(First, Second))]
        struct Both;

        let blueprint = Both::blueprint();
        let shared = [ComponentInfo::of::<Shared>()];

        assert_eq!(
            blueprint.find_most_base(&shared).schema(),
            SchemaId::of::<First>(),
        );
        assert_eq!(blueprint.owner_of::<Shared>(), SchemaId::of::<First>());
    }

    #[test]
    #[should_panic(expected = "duplicate component")]
    fn duplicate_components_are_rejected() {
        #[derive(Schema)]
        #[schema(components(Position, Position))]
        struct Broken;

        Broken::blueprint();
    }

    #[test]
    #[should_panic(expected = "cyclic manager composition")]
    fn cycles_are_rejected() {
        struct Chicken;
        struct Egg;

        impl Schema for Chicken {
            fn define(schema: &mut SchemaDef) {
                schema.base::<Egg>();
            }
        }

        impl Schema for Egg {
            fn define(schema: &mut SchemaDef) {
                schema.base::<Chicken>();
            }
        }

        Chicken::blueprint();
    }
}
