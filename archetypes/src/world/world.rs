use std::{any::type_name, collections::BTreeMap};

use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    archetype::{Archetype, Chunk},
    bundle::Bundle,
    component::{Component, ComponentId},
    config::{ConfigError, WorldConfig},
    entity::Entity,
    error::EcsError,
    query::Query,
    registry::TypeRegistry,
    world::{CommandBuffer, CommitSummary, StagedCommand},
};

/// Handle of a chunk in the world's arena
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct ChunkId(usize);

///
/// World
///
/// Structural calls (create, add/remove component, destroy) only touch pending chunks.
/// Queries and jobs only see committed chunks. [`World::commit`] moves one into the other.
///
pub struct World {
    config: WorldConfig,
    registry: TypeRegistry,
    chunks: Vec<Chunk>,
    committed: BTreeMap<Archetype, ChunkId>,
    pending: BTreeMap<Archetype, ChunkId>,
    retired: FxHashMap<Archetype, ChunkId>,
    owners: FxHashMap<Entity, ChunkId>,
    doomed: FxHashSet<Entity>,
    journal: Vec<StagedCommand>,
    next_id: u64,
}

impl World {
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Result<Self, ConfigError> {
        Ok(Self::build(config.validate()?))
    }

    fn build(config: WorldConfig) -> Self {
        World {
            registry: TypeRegistry::new(config.max_component_types),
            config,
            chunks: Vec::new(),
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
            retired: FxHashMap::default(),
            owners: FxHashMap::default(),
            doomed: FxHashSet::default(),
            journal: Vec::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn register<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        self.registry.register::<T>()
    }

    /// Archetype made of the bundle's types, registering them if needed
    pub fn archetype_for<B: Bundle>(&mut self) -> Result<Archetype, EcsError> {
        self.registry.archetype_of::<B>()
    }

    #[inline]
    fn owner(&self, entity: Entity) -> Result<ChunkId, EcsError> {
        self.owners
            .get(&entity)
            .copied()
            .ok_or(EcsError::EntityNotFound(entity))
    }

    /// Returns pending chunk of `archetype`, reusing a retired one or creating a new one
    fn pending_chunk(&mut self, archetype: Archetype) -> Result<ChunkId, EcsError> {
        if let Some(id) = self.pending.get(&archetype) {
            return Ok(*id);
        }
        let id = match self.retired.remove(&archetype) {
            Some(id) => id,
            None => {
                let rows = self.config.chunk_rows(self.registry.row_bytes(archetype));
                self.chunks
                    .push(Chunk::new(archetype, &self.registry, rows)?);
                ChunkId(self.chunks.len() - 1)
            }
        };
        self.pending.insert(archetype, id);
        Ok(id)
    }

    fn retire(&mut self, archetype: Archetype, id: ChunkId) {
        trace!("Retiring emptied pending chunk of {archetype}");
        self.retired.insert(archetype, id);
    }

    ///
    /// Creates entity without components
    ///
    pub fn create(&mut self) -> Result<Entity, EcsError> {
        self.create_with(())
    }

    ///
    /// Creates entity holding every component of `bundle`. The id is usable right away,
    /// queries see the entity after the next commit.
    ///
    pub fn create_with<B: Bundle>(&mut self, bundle: B) -> Result<Entity, EcsError> {
        if self.next_id == u64::MAX {
            return Err(EcsError::EntityOverflow);
        }
        let archetype = B::register(&mut self.registry)?;
        let chunk = self.pending_chunk(archetype)?;
        let entity = Entity::new(self.next_id);
        self.chunks[chunk.0].append_row(entity, bundle, &self.registry)?;
        self.next_id += 1;
        self.owners.insert(entity, chunk);
        self.journal.push(StagedCommand::Create { entity, archetype });
        Ok(entity)
    }

    ///
    /// Stages entity for removal at the next commit. Staging it again is a no-op.
    ///
    pub fn destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.owner(entity)?;
        if !self.doomed.insert(entity) {
            debug!("{entity} is already staged for removal");
            return Ok(());
        }
        self.journal.push(StagedCommand::Destroy { entity });
        Ok(())
    }

    ///
    /// Adds component to entity, moving its row to the pending chunk of the extended archetype.
    /// If the entity already has a `T` the value is overwritten in place.
    ///
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        let id = self.registry.register::<T>()?;
        let source = self.owner(entity)?;
        let archetype = self.chunks[source.0].archetype();
        if archetype.has(id) {
            self.chunks[source.0].overwrite(entity, id, value)?;
        } else {
            let dest = self.pending_chunk(archetype.with(id))?;
            let (src, dst) = pair_mut(&mut self.chunks, source, dest);
            src.transfer_row_to(dst, entity)?;
            dst.push_component(id, value)?;
            self.owners.insert(entity, dest);
        }
        self.journal.push(StagedCommand::AddComponent {
            entity,
            component: id,
        });
        Ok(())
    }

    ///
    /// Removes component from entity, moving its row to the pending chunk of the reduced archetype.
    ///
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), EcsError> {
        let source = self.owner(entity)?;
        let archetype = self.chunks[source.0].archetype();
        let id = self
            .registry
            .lookup::<T>()
            .filter(|id| archetype.has(*id))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: type_name::<T>(),
            })?;
        let dest = self.pending_chunk(archetype.without(id))?;
        let (src, dst) = pair_mut(&mut self.chunks, source, dest);
        src.transfer_row_to(dst, entity)?;
        self.owners.insert(entity, dest);
        self.journal.push(StagedCommand::RemoveComponent {
            entity,
            component: id,
        });
        Ok(())
    }

    /// Component id of `T` if `chunk` has such column
    fn column_of<T: Component>(&self, chunk: ChunkId) -> Option<ComponentId> {
        let archetype = self.chunks[chunk.0].archetype();
        self.registry
            .lookup::<T>()
            .filter(|id| archetype.has(*id))
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.try_get(entity)?.ok_or(EcsError::MissingComponent {
            entity,
            component: type_name::<T>(),
        })
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.try_get_mut(entity)?.ok_or(EcsError::MissingComponent {
            entity,
            component: type_name::<T>(),
        })
    }

    /// Like [`get`](Self::get) but an absent component is `None` rather than an error
    pub fn try_get<T: Component>(&self, entity: Entity) -> Result<Option<&T>, EcsError> {
        let chunk = self.owner(entity)?;
        match self.column_of::<T>(chunk) {
            Some(id) => self.chunks[chunk.0].read(entity, id).map(Some),
            None => Ok(None),
        }
    }

    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Result<Option<&mut T>, EcsError> {
        let chunk = self.owner(entity)?;
        match self.column_of::<T>(chunk) {
            Some(id) => self.chunks[chunk.0].read_mut(entity, id).map(Some),
            None => Ok(None),
        }
    }

    pub fn has<T: Component>(&self, entity: Entity) -> Result<bool, EcsError> {
        let chunk = self.owner(entity)?;
        Ok(self.column_of::<T>(chunk).is_some())
    }

    /// Current archetype of entity, including uncommitted changes
    pub fn archetype_of(&self, entity: Entity) -> Result<Archetype, EcsError> {
        let chunk = self.owner(entity)?;
        Ok(self.chunks[chunk.0].archetype())
    }

    /// True if entity holds every type of `archetype`
    pub fn contains(&self, entity: Entity, archetype: Archetype) -> Result<bool, EcsError> {
        Ok(self.archetype_of(entity)?.contains(archetype))
    }

    /// True until the entity is destroyed and committed
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.owners.contains_key(&entity)
    }

    /// Number of live entities, committed or not
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Number of rows in the chunk owning the entity
    pub fn chunk_len_of(&self, entity: Entity) -> Result<usize, EcsError> {
        let chunk = self.owner(entity)?;
        Ok(self.chunks[chunk.0].len())
    }

    /// Structural calls made since the last commit, in call order
    pub fn staged(&self) -> &[StagedCommand] {
        &self.journal
    }

    ///
    /// Applies staged changes: first deletes rows of destroyed entities, then moves all
    /// pending rows into committed chunks. Does nothing when nothing is staged.
    ///
    pub fn commit(&mut self) -> Result<CommitSummary, EcsError> {
        let mut summary = CommitSummary::default();
        for command in self.journal.iter() {
            let StagedCommand::Destroy { entity } = command else {
                continue;
            };
            if let Some(chunk) = self.owners.remove(entity) {
                self.chunks[chunk.0].delete_row(*entity)?;
                summary.removed += 1;
            }
        }
        self.doomed.clear();

        for (archetype, pending) in std::mem::take(&mut self.pending) {
            if self.chunks[pending.0].is_empty() {
                self.retire(archetype, pending);
                continue;
            }
            match self.committed.get(&archetype).copied() {
                Some(target) => {
                    let (src, dst) = pair_mut(&mut self.chunks, pending, target);
                    let moved = src.drain_into(dst)?;
                    summary.migrated += moved.len();
                    for entity in moved {
                        self.owners.insert(entity, target);
                    }
                    self.retire(archetype, pending);
                }
                None => {
                    summary.migrated += self.chunks[pending.0].len();
                    self.committed.insert(archetype, pending);
                }
            }
        }
        self.journal.clear();
        if summary != CommitSummary::default() {
            debug!(
                "Commit: {} rows removed, {} rows migrated",
                summary.removed, summary.migrated
            );
        }
        Ok(summary)
    }

    ///
    /// Replays recorded commands in order. Stops at the first failure, dropping the rest.
    /// Returns number of applied commands.
    ///
    pub fn apply(&mut self, mut commands: CommandBuffer) -> Result<usize, EcsError> {
        let mut applied = 0;
        for command in commands.drain() {
            command(self)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Committed chunks in ascending archetype order
    pub fn committed_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.committed.values().map(|id| &self.chunks[id.0])
    }

    /// Committed entities whose archetype contains `required`
    pub fn match_entities(&self, required: Archetype) -> Vec<Entity> {
        self.committed_chunks()
            .filter(|chunk| chunk.archetype().contains(required))
            .flat_map(|chunk| chunk.entities().iter().copied())
            .collect()
    }

    /// Committed entities having every column of `Q`
    pub fn match_query<Q: Query>(&self) -> Result<Vec<Entity>, EcsError> {
        Ok(match Q::archetype(&self.registry)? {
            Some(required) => self.match_entities(required),
            None => Vec::new(),
        })
    }

    ///
    /// Runs `job` for every committed row having the columns of `Q`. Returns number of visited rows.
    ///
    pub fn for_each<'w, Q, F>(&'w mut self, mut job: F) -> Result<usize, EcsError>
    where
        Q: Query,
        F: FnMut(Q::Item<'w>),
    {
        let Some(required) = Q::archetype(&self.registry)? else {
            return Ok(0);
        };
        let mut rows = 0;
        for chunk in matching_mut(&mut self.chunks, &self.committed, required) {
            let (_, columns) = chunk.split();
            for item in Q::iter(columns, &self.registry)? {
                job(item);
                rows += 1;
            }
        }
        Ok(rows)
    }

    /// Same as [`for_each`](Self::for_each) with the entity passed first
    pub fn for_each_with_entity<'w, Q, F>(&'w mut self, mut job: F) -> Result<usize, EcsError>
    where
        Q: Query,
        F: FnMut(Entity, Q::Item<'w>),
    {
        let Some(required) = Q::archetype(&self.registry)? else {
            return Ok(0);
        };
        let mut rows = 0;
        for chunk in matching_mut(&mut self.chunks, &self.committed, required) {
            let (entities, columns) = chunk.split();
            let iter = Q::iter(columns, &self.registry)?;
            for (entity, item) in entities.iter().copied().zip(iter) {
                job(entity, item);
                rows += 1;
            }
        }
        Ok(rows)
    }

    ///
    /// Runs `job` once per matching committed chunk. Chunks never share rows, so each call
    /// is an independent unit of work. Returns number of visited chunks.
    ///
    pub fn for_each_chunk<'w, Q, F>(&'w mut self, mut job: F) -> Result<usize, EcsError>
    where
        Q: Query,
        F: FnMut(&'w [Entity], Q::Iter<'w>),
    {
        let Some(required) = Q::archetype(&self.registry)? else {
            return Ok(0);
        };
        let mut count = 0;
        for chunk in matching_mut(&mut self.chunks, &self.committed, required) {
            let (entities, columns) = chunk.split();
            job(entities, Q::iter(columns, &self.registry)?);
            count += 1;
        }
        Ok(count)
    }

    /// Collects items of every committed row having the columns of `Q`
    pub fn collect<Q: Query>(&mut self) -> Result<Vec<Q::Item<'_>>, EcsError> {
        let Some(required) = Q::archetype(&self.registry)? else {
            return Ok(Vec::new());
        };
        let mut items = Vec::new();
        for chunk in matching_mut(&mut self.chunks, &self.committed, required) {
            let (_, columns) = chunk.split();
            items.extend(Q::iter(columns, &self.registry)?);
        }
        Ok(items)
    }

    /// First item of `Q`, fails with [`EcsError::EmptyResult`] when nothing matches
    pub fn first<Q: Query>(&mut self) -> Result<Q::Item<'_>, EcsError> {
        let Some(required) = Q::archetype(&self.registry)? else {
            return Err(EcsError::EmptyResult);
        };
        for chunk in matching_mut(&mut self.chunks, &self.committed, required) {
            let (_, columns) = chunk.split();
            if let Some(item) = Q::iter(columns, &self.registry)?.next() {
                return Ok(item);
            }
        }
        Err(EcsError::EmptyResult)
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}

/// Committed chunks containing `required`, ascending by archetype
fn matching_mut<'w>(
    chunks: &'w mut [Chunk],
    committed: &BTreeMap<Archetype, ChunkId>,
    required: Archetype,
) -> Vec<&'w mut Chunk> {
    let mut matched = chunks
        .iter_mut()
        .enumerate()
        .filter(|(index, chunk)| {
            chunk.archetype().contains(required)
                && committed.get(&chunk.archetype()) == Some(&ChunkId(*index))
        })
        .map(|(_, chunk)| chunk)
        .collect_vec();
    matched.sort_by_key(|chunk| chunk.archetype());
    matched
}

/// Mutable references to two different chunks
fn pair_mut(chunks: &mut [Chunk], a: ChunkId, b: ChunkId) -> (&mut Chunk, &mut Chunk) {
    debug_assert_ne!(a, b);
    if a.0 < b.0 {
        let (left, right) = chunks.split_at_mut(b.0);
        (&mut left[a.0], &mut right[0])
    } else {
        let (left, right) = chunks.split_at_mut(a.0);
        (&mut right[0], &mut left[b.0])
    }
}
