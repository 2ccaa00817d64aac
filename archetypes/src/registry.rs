use std::any::{TypeId, type_name};

use fxhash::FxHashMap;

use crate::{
    archetype::Archetype,
    bundle::Bundle,
    component::{Component, ComponentId, ComponentInfo, MAX_COMPONENT_ALIGN},
    error::EcsError,
};

/// Hard upper bound of distinct component types, one per archetype mask bit.
pub const MAX_COMPONENT_TYPES: u32 = u64::BITS;

///
/// TypeRegistry
///
/// Hands out component bits in first-use order and keeps their layout descriptors.
///
#[derive(Debug)]
pub struct TypeRegistry {
    capacity: u32,
    ids: FxHashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

impl TypeRegistry {
    /// Creates registry for at most `capacity` types (clamped to the mask width)
    pub fn new(capacity: u32) -> Self {
        TypeRegistry {
            capacity: capacity.min(MAX_COMPONENT_TYPES),
            ids: FxHashMap::default(),
            infos: Vec::new(),
        }
    }

    /// Returns id of `T`, allocating the next free bit on first use.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.lookup::<T>() {
            return Ok(id);
        }
        self.ensure_room(1)?;
        Self::check_layout::<T>()?;
        let id = ComponentId::new(self.infos.len() as u32);
        self.infos.push(ComponentInfo::of::<T>(id));
        self.ids.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Fails if `fresh` more types would not fit
    pub(crate) fn ensure_room(&self, fresh: usize) -> Result<(), EcsError> {
        if self.infos.len() + fresh > self.capacity as usize {
            return Err(EcsError::RegistryOverflow {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub(crate) fn check_layout<T: Component>() -> Result<(), EcsError> {
        if align_of::<T>() > MAX_COMPONENT_ALIGN {
            return Err(EcsError::UnsupportedAlignment {
                name: type_name::<T>(),
                align: align_of::<T>(),
                max: MAX_COMPONENT_ALIGN,
            });
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn knows(&self, type_id: TypeId) -> bool {
        self.ids.contains_key(&type_id)
    }

    #[inline]
    pub fn lookup<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Like [`lookup`](Self::lookup) but fails for unknown types
    #[inline]
    pub fn id_of<T: Component>(&self) -> Result<ComponentId, EcsError> {
        self.lookup::<T>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    pub fn size_of(&self, id: ComponentId) -> Option<usize> {
        self.info(id).map(ComponentInfo::size)
    }

    /// Registers every type of the bundle and returns their union.
    pub fn archetype_of<B: Bundle>(&mut self) -> Result<Archetype, EcsError> {
        B::register(self)
    }

    /// Bytes taken by one row of `archetype`
    pub fn row_bytes(&self, archetype: Archetype) -> usize {
        archetype.ids().filter_map(|id| self.size_of(id)).sum()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentInfo> {
        self.infos.iter()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::new(MAX_COMPONENT_TYPES)
    }
}
