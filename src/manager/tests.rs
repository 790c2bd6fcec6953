use crate::prelude::*;

#[derive(Component, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component, Debug, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Component)]
struct Dead;

#[derive(Schema)]
#[schema(components(Position, Velocity, Dead))]
struct World;

#[derive(Schema)]
#[schema(components(Position, Velocity))]
struct Physics;

#[derive(Schema)]
#[schema(components(Dead), bases(Physics))]
struct Gameplay;

#[test]
fn spawn_round_trip() {
    let mut world = Manager::<World>::new(());
    let id = world.spawn((
        Position { x: 1.0, y: 2.0 },
        Velocity { x: 3.0, y: 4.0 },
    ));

    let entity = world.entity(id).unwrap();

    assert_eq!(*entity.get::<Position>().unwrap(), Position { x: 1.0, y: 2.0 });
    assert_eq!(*entity.get::<Velocity>().unwrap(), Velocity { x: 3.0, y: 4.0 });
    assert!(entity.contains::<Position>());
    assert!(!entity.contains::<Dead>());
    assert_eq!(entity.component_count(), 2);
    assert_eq!(world.len(), 1);
}

#[test]
fn mutation_through_reference() {
    let mut world = Manager::<World>::new(());
    let id = world.spawn((Position { x: 0.0, y: 0.0 },));

    world.entity(id).unwrap().get_mut::<Position>().unwrap().x = 5.0;

    assert_eq!(world.entity(id).unwrap().get::<Position>().unwrap().x, 5.0);
}

#[test]
fn tags_are_signature_only() {
    let mut world = Manager::<World>::new(());
    let id = world.spawn((Position { x: 0.0, y: 0.0 }, Dead));

    let entity = world.entity(id).unwrap();

    assert!(entity.contains::<Dead>());
    assert_eq!(entity.component_count(), 2);
}

#[test]
#[should_panic(expected = "carries no data")]
fn fetching_a_tag_is_rejected() {
    let mut world = Manager::<World>::new(());
    let id = world.spawn((Dead,));

    let _ = world.entity(id).unwrap().get::<Dead>();
}

#[test]
fn missing_component_is_an_error() {
    let mut world = Manager::<World>::new(());
    let id = world.spawn((Position { x: 0.0, y: 0.0 },));

    assert!(world.entity(id).unwrap().get::<Velocity>().is_err());
}

#[test]
#[should_panic(expected = "is not in the vocabulary")]
fn unknown_component_is_rejected() {
    #[derive(Component)]
    struct Unrelated;

    let mut world = Manager::<World>::new(());
    let id = world.spawn((Position { x: 0.0, y: 0.0 },));

    let _ = world.entity(id).unwrap().contains::<Unrelated>();
}

#[test]
#[should_panic(expected = "duplicate component")]
fn duplicate_bundle_components_are_rejected() {
    let mut world = Manager::<World>::new(());

    world.spawn((Position { x: 0.0, y: 0.0 }, Position { x: 1.0, y: 1.0 }));
}

#[test]
fn despawn_retires_slots_and_storage() {
    let mut world = Manager::<World>::new(());
    let ids: Vec<_> = (0..3)
        .map(|i| {
            world.spawn((
                Position { x: i as f32, y: 0.0 },
                Velocity { x: 0.0, y: 0.0 },
            ))
        })
        .collect();

    assert_eq!(world.stored::<Position>(), 3);
    assert_eq!(world.stored::<Velocity>(), 3);

    for &id in &ids {
        world.despawn(id).unwrap();
    }

    assert_eq!(world.len(), 0);
    assert!(world.is_empty());
    assert_eq!(world.free_slot_count(), 3);
    assert_eq!(world.stored::<Position>(), 0);
    assert_eq!(world.stored::<Velocity>(), 0);

    for &id in &ids {
        assert!(!world.contains(id));
        assert!(world.entity(id).is_err());
    }
}

#[test]
fn double_despawn_is_an_error() {
    let mut world = Manager::<World>::new(());
    let id = world.spawn((Position { x: 0.0, y: 0.0 },));

    world.despawn(id).unwrap();

    assert_eq!(world.despawn(id), Err(EntityNotFound(id)));
}

#[test]
fn despawn_keeps_neighbours() {
    let mut world = Manager::<World>::new(());
    let first = world.spawn((Position { x: 1.0, y: 0.0 },));
    let second = world.spawn((Position { x: 2.0, y: 0.0 },));
    let third = world.spawn((Position { x: 3.0, y: 0.0 },));

    world.despawn(second).unwrap();

    assert_eq!(world.len(), 2);
    assert_eq!(world.entity(first).unwrap().get::<Position>().unwrap().x, 1.0);
    assert_eq!(world.entity(third).unwrap().get::<Position>().unwrap().x, 3.0);
}

#[test]
fn insertion_log_is_append_only() {
    let mut world = Manager::<World>::new(());
    let first = world.spawn((Position { x: 0.0, y: 0.0 },));
    let second = world.spawn((Position { x: 0.0, y: 0.0 },));

    world.despawn(first).unwrap();

    assert_eq!(world.component_entities::<Position>(), [first, second]);
}

#[test]
fn derived_entities_project_into_bases() {
    let physics = Manager::<Physics>::new(());
    let mut gameplay = Manager::<Gameplay>::new(&physics);

    let id = gameplay.spawn((
        Position { x: 1.0, y: 2.0 },
        Velocity { x: 3.0, y: 4.0 },
        Dead,
    ));

    // the derived record sees the full signature
    let entity = gameplay.entity(id).unwrap();

    assert!(entity.contains::<Position>());
    assert!(entity.contains::<Dead>());
    assert_eq!(entity.component_count(), 3);
    assert_eq!(entity.get::<Position>().unwrap().x, 1.0);

    // the projection in the base carries the base-visible part
    assert_eq!(physics.len(), 1);

    let projection = physics.entity(EntityId(0)).unwrap();

    assert!(projection.contains::<Position>());
    assert!(projection.contains::<Velocity>());
    assert_eq!(projection.component_count(), 2);
    assert_eq!(projection.get::<Velocity>().unwrap().y, 4.0);
}

#[test]
fn despawning_a_projection_destroys_the_entity() {
    let physics = Manager::<Physics>::new(());
    let mut gameplay = Manager::<Gameplay>::new(&physics);

    gameplay.spawn((Position { x: 0.0, y: 0.0 }, Dead));

    let projection = physics.entity(EntityId(0)).unwrap().handle();

    gameplay.despawn_handle(&projection).unwrap();

    assert_eq!(gameplay.len(), 0);
    assert_eq!(physics.len(), 0);
    assert_eq!(gameplay.free_slot_count(), 1);
    assert_eq!(physics.free_slot_count(), 1);
}

#[test]
fn bases_without_supplied_storage_get_no_projection() {
    let physics = Manager::<Physics>::new(());
    let mut gameplay = Manager::<Gameplay>::new(&physics);

    // only the tag, owned by the derived manager: nothing projects down
    gameplay.spawn((Dead,));

    assert_eq!(gameplay.len(), 1);
    assert_eq!(physics.len(), 0);
}

#[test]
fn derived_bundle_structs_spawn() {
    #[derive(Bundle)]
    struct Moving {
        position: Position,
        velocity: Velocity,
    }

    let mut world = Manager::<World>::new(());
    let id = world.spawn(Moving {
        position: Position { x: 1.0, y: 1.0 },
        velocity: Velocity { x: 2.0, y: 2.0 },
    });

    let entity = world.entity(id).unwrap();

    assert_eq!(entity.component_count(), 2);
    assert_eq!(entity.get::<Velocity>().unwrap().x, 2.0);
}

#[test]
#[should_panic(expected = "expected base")]
fn mismatched_bases_are_rejected() {
    #[derive(Component)]
    struct Sprite(#[allow(dead_code)] u32);

    #[derive(Schema)]
    #[schema(components(Sprite))]
    struct Rendering;

    let rendering = Manager::<Rendering>::new(());

    Manager::<Gameplay>::new(&rendering);
}

#[test]
#[should_panic(expected = "direct bases")]
fn missing_bases_are_rejected() {
    Manager::<Gameplay>::new(());
}

#[test]
fn diamond_composition_shares_the_base() {
    #[derive(Schema)]
    #[schema(bases(Physics))]
    struct Left;

    #[derive(Schema)]
    #[schema(bases(Physics))]
    struct Right;

    #[derive(Schema)]
    #[schema(bases(Left, Right))]
    struct Diamond;

    let physics = Manager::<Physics>::new(());
    let left = Manager::<Left>::new(&physics);
    let right = Manager::<Right>::new(&physics);
    let mut diamond = Manager::<Diamond>::new((&left, &right));

    diamond.spawn((Position { x: 1.0, y: 0.0 },));

    // exactly one projection lands in the shared base
    assert_eq!(physics.len(), 1);
}
