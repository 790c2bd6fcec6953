use std::time::Duration;

use criterion::{criterion_group, criterion_main, Bencher, Criterion};
use stratum::prelude::*;

#[derive(Component)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Component)]
struct Frozen;

#[derive(Schema)]
#[schema(components(Position, Velocity))]
struct Physics;

#[derive(Schema)]
#[schema(components(Frozen), bases(Physics))]
struct Gameplay;

fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    group
        .bench_function("simple", simple)
        .bench_function("dispatched", dispatched);
}

fn simple(bencher: &mut Bencher<'_>) {
    const COUNT: usize = 10_000;

    let mut physics = Manager::<Physics>::new(());

    for _ in 0..COUNT {
        physics.spawn((
            Position { x: 1.0, y: -1.0 },
            Velocity { x: 1.0, y: -1.0 },
        ));
    }

    bencher.iter(|| {
        physics.for_each_matching::<(&mut Position, &Velocity), ()>(
            |(position, velocity): (&mut Position, &Velocity)| {
                position.x += velocity.x;
                position.y += velocity.y;
            },
        );
    });
}

// entities spawned in the derived manager, scanned through their base
// projections
fn dispatched(bencher: &mut Bencher<'_>) {
    const COUNT: usize = 10_000;

    let physics = Manager::<Physics>::new(());
    let mut gameplay = Manager::<Gameplay>::new(&physics);

    for _ in 0..COUNT {
        gameplay.spawn((
            Position { x: 1.0, y: -1.0 },
            Velocity { x: 1.0, y: -1.0 },
            Frozen,
        ));
    }

    bencher.iter(|| {
        gameplay.for_each_matching::<(&mut Position, &Velocity), ()>(
            |(position, velocity): (&mut Position, &Velocity)| {
                position.x += velocity.x;
                position.y += velocity.y;
            },
        );
    });
}

criterion_group!(
    name = this;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(4));
    targets = benchmark,
);
criterion_main!(this);
