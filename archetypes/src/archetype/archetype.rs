use std::{
    fmt::Display,
    ops::{BitOr, BitOrAssign},
};

use crate::{component::ComponentId, error::EcsError};

///
/// Archetype
///
/// Set of component types as a bitmask, one bit per registered type.
///
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default, Debug)]
#[repr(transparent)]
pub struct Archetype(u64);

impl Archetype {
    pub const EMPTY: Archetype = Archetype(0);

    pub const fn from_bits(bits: u64) -> Self {
        Archetype(bits)
    }

    #[inline(always)]
    pub const fn bits(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn with(self, id: ComponentId) -> Self {
        Archetype(self.0 | 1u64 << id.index())
    }

    #[inline]
    pub const fn without(self, id: ComponentId) -> Self {
        Archetype(self.0 & !(1u64 << id.index()))
    }

    #[inline]
    pub const fn union(self, other: Archetype) -> Self {
        Archetype(self.0 | other.0)
    }

    /// True if every type of `other` is present in this archetype.
    #[inline]
    pub const fn contains(&self, other: Archetype) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn has(&self, id: ComponentId) -> bool {
        self.0 & 1u64 << id.index() != 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Position of the column for `id` among this archetype's columns (ordered by bit).
    #[inline]
    pub(crate) fn column_index(&self, id: ComponentId) -> Option<usize> {
        if !self.has(id) {
            return None;
        }
        let below = id.mask() - 1;
        Some((self.0 & below).count_ones() as usize)
    }

    /// Iterates component ids in ascending bit order
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + use<> {
        let mut rest = self.0;
        std::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let index = rest.trailing_zeros();
            rest &= rest - 1;
            Some(ComponentId::new(index))
        })
    }

    /// Adds `id` for type `T`, rejecting a type that is already present.
    pub(crate) fn with_unique<T>(self, id: ComponentId) -> Result<Self, EcsError> {
        if self.has(id) {
            return Err(EcsError::DuplicateComponent(std::any::type_name::<T>()));
        }
        Ok(self.with(id))
    }
}

impl From<ComponentId> for Archetype {
    fn from(id: ComponentId) -> Self {
        Archetype(id.mask())
    }
}

impl BitOr for Archetype {
    type Output = Archetype;

    fn bitor(self, rhs: Archetype) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOr<ComponentId> for Archetype {
    type Output = Archetype;

    fn bitor(self, rhs: ComponentId) -> Self::Output {
        self.with(rhs)
    }
}

impl BitOrAssign<ComponentId> for Archetype {
    fn bitor_assign(&mut self, rhs: ComponentId) {
        *self = self.with(rhs);
    }
}

impl Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Archetype({:#b})", self.0)
    }
}
