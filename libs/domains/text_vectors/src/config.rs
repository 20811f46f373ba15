use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

use crate::models::DEFAULT_DIMENSION;

pub const DEFAULT_COLLECTION: &str = "text_vectors";

/// Collection the service writes to and the vector length it enforces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub collection: String,
    pub dimension: usize,
}

impl StoreConfig {
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION, DEFAULT_DIMENSION)
    }
}

impl FromEnv for StoreConfig {
    /// - VECTOR_COLLECTION: defaults to "text_vectors"
    /// - VECTOR_DIMENSION: defaults to 384
    fn from_env() -> Result<Self, ConfigError> {
        let dimension: usize = env_parse("VECTOR_DIMENSION", DEFAULT_DIMENSION)?;
        if dimension == 0 {
            return Err(ConfigError::ParseError {
                key: "VECTOR_DIMENSION".to_string(),
                details: "dimension must be positive".to_string(),
            });
        }

        Ok(Self {
            collection: env_or_default("VECTOR_COLLECTION", DEFAULT_COLLECTION),
            dimension,
        })
    }
}
