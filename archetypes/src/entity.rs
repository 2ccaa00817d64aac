use std::fmt::Display;

///
/// Entity
///
/// Opaque identity handed out in increasing order and never reused.
///
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    pub const fn new(id: u64) -> Self {
        Entity(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}
