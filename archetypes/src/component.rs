use std::{
    any::{TypeId, type_name},
    fmt::Display,
};

use bytemuck::Pod;

///
/// Component
///
/// Anything that is plain old data can be stored in a chunk column.
///
pub trait Component: Pod {}

impl<T: Pod> Component for T {}

/// Widest alignment a component may have. Columns are backed by `u64` words.
pub const MAX_COMPONENT_ALIGN: usize = align_of::<u64>();

///
/// ComponentId
///
/// Index of the single bit owned by a component type.
///
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct ComponentId(u8);

impl ComponentId {
    pub(crate) fn new(index: u32) -> Self {
        debug_assert!(index < u64::BITS);
        ComponentId(index as u8)
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    #[inline(always)]
    pub const fn mask(&self) -> u64 {
        1u64 << self.0
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

///
/// ComponentInfo
///
/// Size and alignment descriptor recorded at registration. Every typed column access is checked against it.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    id: ComponentId,
    type_id: TypeId,
    name: &'static str,
    size: usize,
    align: usize,
}

impl ComponentInfo {
    pub(crate) fn of<T: Component>(id: ComponentId) -> Self {
        ComponentInfo {
            id,
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    /// Checks that `T` is the type this descriptor was recorded for.
    #[inline]
    pub fn matches<T: Component>(&self) -> bool {
        self.type_id == TypeId::of::<T>() && self.size == size_of::<T>()
    }
}

#[cfg(test)]
mod test {
    use super::{ComponentId, ComponentInfo};

    #[test]
    fn info() {
        let info = ComponentInfo::of::<[f32; 3]>(ComponentId::new(5));
        assert_eq!(5, info.id().index());
        assert_eq!(0b100000, info.id().mask());
        assert_eq!(12, info.size());
        assert_eq!(4, info.align());
        assert!(info.matches::<[f32; 3]>());
        assert!(!info.matches::<[u32; 3]>());
        assert!(!info.matches::<f32>());
    }
}
