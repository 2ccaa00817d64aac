use std::any::{TypeId, type_name};

use crate::{
    archetype::{Archetype, Chunk},
    component::Component,
    error::EcsError,
    registry::TypeRegistry,
};

///
/// Bundle
///
/// Tuple of components forming a complete row. `()` is the row of the empty archetype.
///
pub trait Bundle: 'static {
    /// Registers all types of the bundle and returns their union.
    /// Nothing is registered unless every type can be.
    fn register(registry: &mut TypeRegistry) -> Result<Archetype, EcsError>;

    /// Union of the bundle's types, which must be registered already
    fn archetype(registry: &TypeRegistry) -> Result<Archetype, EcsError>;

    /// Pushes every value into the matching column of `chunk`
    fn write(self, chunk: &mut Chunk, registry: &TypeRegistry) -> Result<(), EcsError>;
}

impl Bundle for () {
    fn register(_: &mut TypeRegistry) -> Result<Archetype, EcsError> {
        Ok(Archetype::EMPTY)
    }

    fn archetype(_: &TypeRegistry) -> Result<Archetype, EcsError> {
        Ok(Archetype::EMPTY)
    }

    fn write(self, _: &mut Chunk, _: &TypeRegistry) -> Result<(), EcsError> {
        Ok(())
    }
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn register(registry: &mut TypeRegistry) -> Result<Archetype, EcsError> {
                let types = [$((TypeId::of::<$name>(), type_name::<$name>())),+];
                for (index, (type_id, name)) in types.iter().enumerate() {
                    if types[..index].iter().any(|(other, _)| other == type_id) {
                        return Err(EcsError::DuplicateComponent(*name));
                    }
                }
                registry.ensure_room(types.iter().filter(|(id, _)| !registry.knows(*id)).count())?;
                $(TypeRegistry::check_layout::<$name>()?;)+
                let archetype = Archetype::EMPTY;
                $(let archetype = archetype.with_unique::<$name>(registry.register::<$name>()?)?;)+
                Ok(archetype)
            }

            fn archetype(registry: &TypeRegistry) -> Result<Archetype, EcsError> {
                let archetype = Archetype::EMPTY;
                $(let archetype = archetype.with_unique::<$name>(registry.id_of::<$name>()?)?;)+
                Ok(archetype)
            }

            #[allow(non_snake_case)]
            fn write(self, chunk: &mut Chunk, registry: &TypeRegistry) -> Result<(), EcsError> {
                let ($($name,)+) = self;
                $(chunk.push_component(registry.id_of::<$name>()?, $name)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
