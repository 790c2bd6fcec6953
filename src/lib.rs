//! A statically-composed, hierarchical entity-component-system runtime.
//!
//! Entities live in [`Manager`]s: shards that each own a declared subset of
//! component types. Managers compose through base managers declared in their
//! [`Schema`], forming a DAG; entities created in a derived manager project
//! into every base manager that owns one of their storage components, so
//! queries restricted to a base's vocabulary transparently include them.
//!
//! ```
//! use stratum::prelude::*;
//!
//! #[derive(Component)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//!
//! #[derive(Component)]
//! struct Velocity {
//!     x: f32,
//!     y: f32,
//! }
//!
//! #[derive(Schema)]
//! #[schema(components(Position, Velocity))]
//! struct Physics;
//!
//! let mut physics = Manager::<Physics>::new(());
//!
//! physics.spawn((Position { x: 0.0, y: 0.0 }, Velocity { x: 1.0, y: 2.0 }));
//!
//! physics.for_each_matching::<(&mut Position, &Velocity), ()>(
//!     |(position, velocity): (&mut Position, &Velocity)| {
//!         position.x += velocity.x;
//!         position.y += velocity.y;
//!     },
//! );
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]

// allows using derive macros that reference `stratum` internally
extern crate self as stratum;

pub use self::bundle::*;
pub use self::component::*;
pub use self::entity::*;
pub use self::manager::*;
pub use self::query::*;
pub use self::queue::*;
pub use self::schema::*;
pub use self::signature::*;
pub use self::storage::*;

pub mod prelude;

mod bundle;
mod component;
mod entity;
mod manager;
mod query;
mod queue;
mod schema;
mod signature;
mod storage;
