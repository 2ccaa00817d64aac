use crate::{
    archetype::Archetype,
    bundle::Bundle,
    component::{Component, ComponentId},
    entity::Entity,
    error::EcsError,
    world::World,
};

///
/// StagedCommand
///
/// Journal entry of a structural call made since the last commit.
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StagedCommand {
    Create {
        entity: Entity,
        archetype: Archetype,
    },
    AddComponent {
        entity: Entity,
        component: ComponentId,
    },
    RemoveComponent {
        entity: Entity,
        component: ComponentId,
    },
    Destroy {
        entity: Entity,
    },
}

///
/// CommitSummary
///
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CommitSummary {
    /// Rows deleted in the removal phase
    pub removed: usize,
    /// Rows made visible to queries
    pub migrated: usize,
}

type Deferred = Box<dyn FnOnce(&mut World) -> Result<(), EcsError>>;

///
/// CommandBuffer
///
/// Structural edits recorded while the world is borrowed by a running job.
/// Replayed in order by [`World::apply`].
///
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Deferred>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create<B: Bundle>(&mut self, bundle: B) {
        self.commands
            .push(Box::new(move |world: &mut World| world.create_with(bundle).map(|_| ())));
    }

    pub fn destroy(&mut self, entity: Entity) {
        self.commands
            .push(Box::new(move |world: &mut World| world.destroy(entity)));
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
        self.commands
            .push(Box::new(move |world: &mut World| world.add_component(entity, value)));
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        self.commands
            .push(Box::new(move |world: &mut World| world.remove_component::<T>(entity)));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Deferred> {
        self.commands.drain(..)
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("len", &self.commands.len())
            .finish()
    }
}
