use itertools::Zip;

use crate::{
    archetype::{Archetype, Buffer, Columns, Rows, RowsMut},
    component::{Component, ComponentId},
    error::EcsError,
    registry::TypeRegistry,
};

///
/// Fetch
///
/// Access to a single column: `&T` reads it, `&mut T` writes it.
///
pub trait Fetch {
    type Component: Component;
    type Item<'c>;
    type Iter<'c>: Iterator<Item = Self::Item<'c>>;

    fn borrow<'c>(columns: &mut Columns<'c>, id: ComponentId) -> Result<Self::Iter<'c>, EcsError>;
}

impl<T> Fetch for &T
where
    T: Component,
{
    type Component = T;
    type Item<'c> = &'c T;
    type Iter<'c> = Rows<'c, T>;

    fn borrow<'c>(columns: &mut Columns<'c>, id: ComponentId) -> Result<Self::Iter<'c>, EcsError> {
        let column: &'c Buffer = columns.take(id)?;
        column.rows::<T>()
    }
}

impl<T> Fetch for &mut T
where
    T: Component,
{
    type Component = T;
    type Item<'c> = &'c mut T;
    type Iter<'c> = RowsMut<'c, T>;

    fn borrow<'c>(columns: &mut Columns<'c>, id: ComponentId) -> Result<Self::Iter<'c>, EcsError> {
        columns.take(id)?.rows_mut::<T>()
    }
}

///
/// Query
///
/// Descriptor of the columns a job wants, e.g. `(&mut Position, &Velocity)`.
///
pub trait Query {
    type Item<'c>;
    type Iter<'c>: Iterator<Item = Self::Item<'c>>;

    /// Required archetype, or `None` when some type was never registered (nothing can match).
    fn archetype(registry: &TypeRegistry) -> Result<Option<Archetype>, EcsError>;

    /// Row iterator over one chunk having all the required columns
    fn iter<'c>(columns: Columns<'c>, registry: &TypeRegistry) -> Result<Self::Iter<'c>, EcsError>;
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Fetch),+> Query for ($($name,)+) {
            type Item<'c> = ($($name::Item<'c>,)+);
            type Iter<'c> = Zip<($($name::Iter<'c>,)+)>;

            fn archetype(registry: &TypeRegistry) -> Result<Option<Archetype>, EcsError> {
                let archetype = Archetype::EMPTY;
                $(
                    let Some(id) = registry.lookup::<$name::Component>() else {
                        return Ok(None);
                    };
                    let archetype = archetype.with_unique::<$name::Component>(id)?;
                )+
                Ok(Some(archetype))
            }

            fn iter<'c>(mut columns: Columns<'c>, registry: &TypeRegistry) -> Result<Self::Iter<'c>, EcsError> {
                Ok(itertools::multizip((
                    $($name::borrow(&mut columns, registry.id_of::<$name::Component>()?)?,)+
                )))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);
impl_query!(A, B, C, D, E, F, G);
impl_query!(A, B, C, D, E, F, G, H);

///
/// Tests
///
#[cfg(test)]
mod test {
    use bytemuck::{Pod, Zeroable};
    use itertools::Itertools;

    use crate::{
        archetype::{Archetype, Chunk},
        entity::Entity,
        error::EcsError,
        registry::TypeRegistry,
    };

    use super::Query;

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position(i32, i32);

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Direction(i8, i8);

    fn storage(registry: &mut TypeRegistry) -> Chunk {
        let archetype = registry
            .archetype_of::<(Direction, Position, f64)>()
            .unwrap();
        let mut chunk = Chunk::new(archetype, registry, 16).unwrap();
        for i in 0..10 {
            chunk
                .append_row(
                    Entity::new(i),
                    (Direction(1, -1), Position(i as i32, 0), i as f64),
                    registry,
                )
                .unwrap();
        }
        chunk
    }

    #[test]
    fn archetype() {
        let mut registry = TypeRegistry::default();
        assert_eq!(None, <(&Position,)>::archetype(&registry).unwrap());
        storage(&mut registry);
        assert_eq!(
            Some(Archetype::from_bits(0b11)),
            <(&mut Position, &Direction)>::archetype(&registry).unwrap()
        );
        assert_eq!(
            Err(EcsError::DuplicateComponent(std::any::type_name::<Position>())),
            <(&mut Position, &Position)>::archetype(&registry)
        );
    }

    #[test]
    fn visit() {
        let mut registry = TypeRegistry::default();
        let mut chunk = storage(&mut registry);

        // Pass 1
        let (_, columns) = chunk.split();
        for (pos, dir) in <(&mut Position, &Direction)>::iter(columns, &registry).unwrap() {
            pos.0 += dir.0 as i32 * 17;
            pos.1 += dir.1 as i32 * 77;
        }

        // Pass 2
        let (entities, columns) = chunk.split();
        let rows = entities
            .iter()
            .zip(<(&Position, &f64)>::iter(columns, &registry).unwrap())
            .map(|(e, (pos, f))| (e.id(), *pos, *f))
            .collect_vec();
        assert_eq!(10, rows.len());
        assert_eq!((0, Position(17, -77), 0.), rows[0]);
        assert_eq!((9, Position(26, -77), 9.), rows[9]);
    }

    #[test]
    fn missing_column() {
        let mut registry = TypeRegistry::default();
        let mut chunk = storage(&mut registry);
        registry.register::<u8>().unwrap();
        let (_, columns) = chunk.split();
        assert!(matches!(
            <(&u8, &Position)>::iter(columns, &registry),
            Err(EcsError::NoSuchColumn(_))
        ));
    }
}
