//! Deferred structural mutation of a manager.

use crate::bundle::Bundle;
use crate::entity::EntityHandle;
use crate::manager::Manager;
use crate::schema::Schema;

/// A queue of commands to be performed on a [`Manager`].
///
/// Structural mutation is not allowed while a query scans (the involved
/// storage is borrowed); commands queued from inside the callback are applied
/// with [`apply`](CommandQueue::apply) once the scan has returned.
pub struct CommandQueue<M: Schema> {
    inner: Vec<CommandBox<M>>,
}

struct CommandBox<M: Schema> {
    inner: Box<dyn FnOnce(&mut Manager<M>) + Send>,
}

impl<M: Schema> CommandQueue<M> {
    /// Creates a new empty queue.
    pub const fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// The amount of queued commands.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues an arbitrary command.
    pub fn push_fn(
        &mut self,
        f: impl FnOnce(&mut Manager<M>) + Send + 'static,
    ) {
        self.inner.push(CommandBox { inner: Box::new(f) });
    }

    /// Queues spawning an entity.
    pub fn spawn<B: Bundle + Send>(&mut self, bundle: B) {
        self.push_fn(move |manager| {
            manager.spawn(bundle);
        });
    }

    /// Queues despawning the entity behind a handle.
    ///
    /// A handle that no longer names a live entity when the queue is applied
    /// is ignored.
    pub fn despawn(&mut self, entity: EntityHandle) {
        self.push_fn(move |manager| {
            let _ = manager.despawn_handle(&entity);
        });
    }

    /// Applies the queued commands to the manager, in queue order.
    pub fn apply(&mut self, manager: &mut Manager<M>) {
        for command in self.inner.drain(..) {
            (command.inner)(manager);
        }
    }
}

impl<M: Schema> Default for CommandQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Component)]
    struct Counter(u32);

    #[derive(Schema)]
    #[schema(components(Counter))]
    struct World;

    #[test]
    fn commands_apply_in_queue_order() {
        let mut world = Manager::<World>::new(());
        let mut queue = CommandQueue::new();

        queue.spawn((Counter(1),));
        queue.push_fn(|manager| {
            manager.spawn((Counter(2),));
        });

        assert_eq!(queue.len(), 2);

        queue.apply(&mut world);

        assert!(queue.is_empty());
        assert_eq!(world.len(), 2);

        let mut visited = Vec::new();

        world.for_each_matching::<(&Counter,), ()>(
            |(counter,): (&Counter,)| visited.push(counter.0),
        );

        assert_eq!(visited, [1, 2]);
    }

    #[test]
    fn despawning_a_dead_handle_is_ignored() {
        let mut world = Manager::<World>::new(());
        let id = world.spawn((Counter(0),));
        let handle = world.entity(id).unwrap().handle();
        let mut queue = CommandQueue::new();

        queue.despawn(handle.clone());
        queue.despawn(handle);
        queue.apply(&mut world);

        assert_eq!(world.len(), 0);
    }
}
