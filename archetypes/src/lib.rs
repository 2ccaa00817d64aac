pub use archetype::{Archetype, Chunk};
pub use bundle::Bundle;
pub use component::{Component, ComponentId, ComponentInfo};
pub use config::{ConfigError, WorldConfig};
pub use entity::Entity;
pub use error::EcsError;
pub use query::{Fetch, Query};
pub use registry::TypeRegistry;
pub use world::{CommandBuffer, CommitSummary, StagedCommand, World};

pub mod archetype;
pub mod bundle;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod world;
