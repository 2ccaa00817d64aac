use log::trace;

use crate::{
    archetype::{Archetype, Buffer},
    bundle::Bundle,
    component::{Component, ComponentId},
    entity::Entity,
    error::EcsError,
    registry::TypeRegistry,
};

///
/// Chunk
///
/// Storage of one archetype: the entity sequence plus one column per component type.
/// Row `i` of every column belongs to `entities[i]`.
///
#[derive(Debug)]
pub struct Chunk {
    archetype: Archetype,
    entities: Vec<Entity>,
    columns: Vec<Buffer>,
}

impl Chunk {
    /// Creates empty chunk with a column for each type of `archetype`.
    /// # Arguments:
    /// * `capacity` - number of rows to reserve
    pub fn new(
        archetype: Archetype,
        registry: &TypeRegistry,
        capacity: usize,
    ) -> Result<Self, EcsError> {
        let columns = archetype
            .ids()
            .map(|id| {
                registry
                    .info(id)
                    .map(|info| Buffer::with_capacity(info.clone(), capacity))
                    .ok_or(EcsError::NoSuchColumn(id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        trace!("New chunk for {archetype} ({capacity} rows reserved)");
        Ok(Chunk {
            archetype,
            entities: Vec::with_capacity(capacity),
            columns,
        })
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Finds row of `entity` by scanning the entity sequence
    pub fn locate(&self, entity: Entity) -> Result<usize, EcsError> {
        self.entities
            .iter()
            .position(|e| *e == entity)
            .ok_or(EcsError::EntityNotFound(entity))
    }

    pub fn buffer(&self, id: ComponentId) -> Option<&Buffer> {
        self.columns.get(self.archetype.column_index(id)?)
    }

    fn buffer_mut(&mut self, id: ComponentId) -> Result<&mut Buffer, EcsError> {
        let index = self
            .archetype
            .column_index(id)
            .ok_or(EcsError::NoSuchColumn(id))?;
        Ok(&mut self.columns[index])
    }

    pub fn read<T: Component>(&self, entity: Entity, id: ComponentId) -> Result<&T, EcsError> {
        let row = self.locate(entity)?;
        self.buffer(id).ok_or(EcsError::NoSuchColumn(id))?.at(row)
    }

    pub fn read_mut<T: Component>(
        &mut self,
        entity: Entity,
        id: ComponentId,
    ) -> Result<&mut T, EcsError> {
        let row = self.locate(entity)?;
        self.buffer_mut(id)?.at_mut(row)
    }

    /// Appends a complete row. Nothing is written unless the bundle has exactly this chunk's archetype.
    pub fn append_row<B: Bundle>(
        &mut self,
        entity: Entity,
        bundle: B,
        registry: &TypeRegistry,
    ) -> Result<usize, EcsError> {
        let found = B::archetype(registry)?;
        if found != self.archetype {
            return Err(EcsError::ArchetypeMismatch {
                expected: self.archetype,
                found,
            });
        }
        let row = self.entities.len();
        self.entities.push(entity);
        if let Err(e) = bundle.write(self, registry) {
            self.truncate(row);
            return Err(e);
        }
        Ok(row)
    }

    /// Replaces the value of one component in an existing row
    pub fn overwrite<T: Component>(
        &mut self,
        entity: Entity,
        id: ComponentId,
        value: T,
    ) -> Result<(), EcsError> {
        *self.read_mut::<T>(entity, id)? = value;
        Ok(())
    }

    /// Pushes a value into the column of `id`. Used to fill a freshly appended or transferred row.
    pub(crate) fn push_component<T: Component>(
        &mut self,
        id: ComponentId,
        value: T,
    ) -> Result<usize, EcsError> {
        self.buffer_mut(id)?.append(value)
    }

    ///
    /// Moves row of `entity` to `target`. Columns both chunks share are copied, columns only
    /// the target has are left for the caller to fill, the rest is dropped. Returns the row index in `target`.
    ///
    pub(crate) fn transfer_row_to(
        &mut self,
        target: &mut Chunk,
        entity: Entity,
    ) -> Result<usize, EcsError> {
        self.check_rows()?;
        let row = self.locate(entity)?;
        let index = target.entities.len();
        let copied = target.columns.iter_mut().try_for_each(|column| {
            match self.buffer(column.info().id()) {
                Some(source) => column.append_from(source, row).map(|_| ()),
                None => Ok(()),
            }
        });
        if let Err(e) = copied {
            target.truncate(index);
            return Err(e);
        }
        target.entities.push(entity);
        self.remove_at(row)?;
        trace!(
            "Moved {entity} from {} to {}",
            self.archetype, target.archetype
        );
        Ok(index)
    }

    /// Removes row of `entity` from every column and from the entity sequence
    pub fn delete_row(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.check_rows()?;
        let row = self.locate(entity)?;
        self.remove_at(row)
    }

    /// Fails unless every column holds exactly one row per entity
    fn check_rows(&self) -> Result<(), EcsError> {
        if self.columns.iter().all(|c| c.len() == self.entities.len()) {
            Ok(())
        } else {
            Err(EcsError::RowMismatch(self.archetype))
        }
    }

    fn remove_at(&mut self, row: usize) -> Result<(), EcsError> {
        debug_assert!(self.columns.iter().all(|c| c.len() == self.entities.len()));
        for column in self.columns.iter_mut() {
            column.remove(row)?;
        }
        self.entities.remove(row);
        Ok(())
    }

    /// Moves all rows to the end of `target`, which must be of the same archetype. Returns moved entities.
    pub(crate) fn drain_into(&mut self, target: &mut Chunk) -> Result<Vec<Entity>, EcsError> {
        if target.archetype != self.archetype {
            return Err(EcsError::ArchetypeMismatch {
                expected: target.archetype,
                found: self.archetype,
            });
        }
        self.check_rows()?;
        target.check_rows()?;
        for (dest, source) in target.columns.iter_mut().zip(self.columns.iter_mut()) {
            dest.drain_from(source)?;
        }
        let moved = std::mem::take(&mut self.entities);
        target.entities.extend_from_slice(&moved);
        Ok(moved)
    }

    /// Drops rows from `rows` onwards in every column
    fn truncate(&mut self, rows: usize) {
        self.entities.truncate(rows);
        for column in self.columns.iter_mut() {
            column.truncate(rows);
        }
    }

    /// Splits chunk into its entity sequence and independently borrowable columns.
    pub fn split(&mut self) -> (&[Entity], Columns<'_>) {
        let columns = Columns {
            archetype: self.archetype,
            slots: self.columns.iter_mut().map(Some).collect(),
        };
        (&self.entities, columns)
    }
}

///
/// Columns
///
/// Columns of one chunk, each of which can be taken out once.
///
pub struct Columns<'c> {
    archetype: Archetype,
    slots: Vec<Option<&'c mut Buffer>>,
}

impl<'c> Columns<'c> {
    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Takes column of `id`. Fails if the chunk has no such column or it was already taken.
    pub fn take(&mut self, id: ComponentId) -> Result<&'c mut Buffer, EcsError> {
        self.archetype
            .column_index(id)
            .and_then(|index| self.slots[index].take())
            .ok_or(EcsError::NoSuchColumn(id))
    }
}
