use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{entity::Entity, registry::MAX_COMPONENT_TYPES};

/// Largest per-chunk reservation a config may ask for
pub const MAX_CHUNK_SIZE_IN_BYTES: usize = 64 * 1024 * 1024;

///
/// ConfigError
///
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("max_component_types must be in 1..=64, got {0}!")]
    InvalidComponentLimit(u32),
    #[error("chunk_size_in_bytes must be in 1..=67108864, got {0}!")]
    InvalidChunkSize(usize),
}

///
/// WorldConfig
///
/// ```toml
/// max_component_types = 32
/// chunk_size_in_bytes = 65536
/// ```
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of distinct component types the registry accepts
    pub max_component_types: u32,
    /// Bytes worth of rows reserved up front by every new chunk
    pub chunk_size_in_bytes: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            max_component_types: MAX_COMPONENT_TYPES,
            chunk_size_in_bytes: 16 * 1024,
        }
    }
}

impl WorldConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = toml::from_str(text)?;
        config.validate()
    }

    pub fn load<R>(reader: &mut R) -> Result<Self, ConfigError>
    where
        R: Read,
    {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_toml(&buf)
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_component_types == 0 || self.max_component_types > MAX_COMPONENT_TYPES {
            return Err(ConfigError::InvalidComponentLimit(self.max_component_types));
        }
        if self.chunk_size_in_bytes == 0 || self.chunk_size_in_bytes > MAX_CHUNK_SIZE_IN_BYTES {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size_in_bytes));
        }
        Ok(self)
    }

    /// Rows to reserve for a chunk whose components take `row_bytes` per row.
    /// The entity id stored alongside every row counts against the budget too.
    pub(crate) fn chunk_rows(&self, row_bytes: usize) -> usize {
        let budget = self.chunk_size_in_bytes.min(MAX_CHUNK_SIZE_IN_BYTES);
        let row = row_bytes.saturating_add(size_of::<Entity>());
        std::cmp::max(1, budget / row)
    }
}

#[cfg(test)]
mod test {
    use super::{ConfigError, MAX_CHUNK_SIZE_IN_BYTES, WorldConfig};

    #[test]
    fn parse() {
        let config = WorldConfig::from_toml("max_component_types = 8").unwrap();
        assert_eq!(8, config.max_component_types);
        assert_eq!(WorldConfig::default().chunk_size_in_bytes, config.chunk_size_in_bytes);

        let mut reader = "chunk_size_in_bytes = 64".as_bytes();
        let config = WorldConfig::load(&mut reader).unwrap();
        assert_eq!(64, config.max_component_types);
        assert_eq!(64, config.chunk_size_in_bytes);
        assert_eq!(4, config.chunk_rows(8));
        assert_eq!(1, config.chunk_rows(1000));
        // entity ids alone
        assert_eq!(8, config.chunk_rows(0));
    }

    #[test]
    fn invalid() {
        assert!(matches!(
            WorldConfig::from_toml("max_component_types = 65"),
            Err(ConfigError::InvalidComponentLimit(65))
        ));
        assert!(matches!(
            WorldConfig::from_toml("max_component_types = 0"),
            Err(ConfigError::InvalidComponentLimit(0))
        ));
        assert!(matches!(
            WorldConfig::from_toml("max_component_types = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn chunk_size_bounds() {
        assert!(matches!(
            WorldConfig::from_toml("chunk_size_in_bytes = 9223372036854775807"),
            Err(ConfigError::InvalidChunkSize(9223372036854775807))
        ));
        assert!(matches!(
            WorldConfig::from_toml("chunk_size_in_bytes = 0"),
            Err(ConfigError::InvalidChunkSize(0))
        ));
        let largest = format!("chunk_size_in_bytes = {MAX_CHUNK_SIZE_IN_BYTES}");
        assert!(WorldConfig::from_toml(&largest).is_ok());

        // fields are public, so unvalidated values still reserve a bounded number of rows
        let config = WorldConfig {
            chunk_size_in_bytes: usize::MAX,
            ..Default::default()
        };
        assert!(config.clone().validate().is_err());
        assert_eq!(MAX_CHUNK_SIZE_IN_BYTES / 8, config.chunk_rows(0));
        assert_eq!(1, config.chunk_rows(usize::MAX));

        let config = WorldConfig::default();
        assert_eq!(2048, config.chunk_rows(0));
        assert_eq!(1024, config.chunk_rows(8));
    }
}
