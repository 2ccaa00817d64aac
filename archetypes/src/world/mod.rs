mod commands;
mod world;

pub use commands::{CommandBuffer, CommitSummary, StagedCommand};
pub use world::World;
