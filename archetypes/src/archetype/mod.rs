pub mod archetype;
pub mod buffer;
pub mod chunk;

pub use archetype::Archetype;
pub use buffer::{Buffer, Rows, RowsMut};
pub use chunk::{Chunk, Columns};
