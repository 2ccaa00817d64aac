use thiserror::Error;

use crate::{archetype::Archetype, component::ComponentId, entity::Entity};

///
/// EcsError
///
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("Type mismatch: column holds `{expected}`, accessed as `{found}`!")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("No such entity: {0}!")]
    EntityNotFound(Entity),
    #[error("Component registry is full ({capacity} types)!")]
    RegistryOverflow { capacity: u32 },
    #[error("Query matched nothing!")]
    EmptyResult,
    #[error("{entity} has no component `{component}`!")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
    #[error("Component `{0}` is not registered!")]
    UnregisteredComponent(&'static str),
    #[error("Component `{0}` is listed more than once!")]
    DuplicateComponent(&'static str),
    #[error("Component `{name}` needs {align}-byte alignment, at most {max} is supported!")]
    UnsupportedAlignment {
        name: &'static str,
        align: usize,
        max: usize,
    },
    #[error("Row of {found} does not fit chunk of {expected}!")]
    ArchetypeMismatch {
        expected: Archetype,
        found: Archetype,
    },
    #[error("Columns of {0} are out of step with its entities!")]
    RowMismatch(Archetype),
    #[error("No such column: {0}!")]
    NoSuchColumn(ComponentId),
    #[error("Index is out of bounds!")]
    OutOfBounds,
    #[error("Entity id space is exhausted!")]
    EntityOverflow,
}
