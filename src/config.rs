use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::types::{
    BUFFER_POOL_SIZE, PAGE_SIZE,
    error::{DatabaseError, Result},
};

/// Knobs for the execution layer. Missing fields in a TOML file fall back to
/// the engine constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Frames in the shared buffer pool.
    pub buffer_pool_size: usize,
    /// Bytes per buffer pool frame.
    pub page_size: usize,
    /// Pages a block nested-loop join may pin, split evenly between its two
    /// sides. `None` means half of `buffer_pool_size`.
    pub join_pool_pages: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            buffer_pool_size: BUFFER_POOL_SIZE,
            page_size: PAGE_SIZE,
            join_pool_pages: None,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_pool_size == 0 {
            return Err(DatabaseError::Config {
                details: "buffer_pool_size must be greater than 0".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(DatabaseError::Config {
                details: "page_size must be greater than 0".to_string(),
            });
        }
        let join_pages = self.join_pool_pages();
        if join_pages < 2 || join_pages > self.buffer_pool_size {
            return Err(DatabaseError::Config {
                details: format!(
                    "join_pool_pages must be between 2 and buffer_pool_size ({}), got {}",
                    self.buffer_pool_size, join_pages
                ),
            });
        }
        Ok(())
    }

    /// Effective page budget of one block nested-loop join.
    pub fn join_pool_pages(&self) -> usize {
        self.join_pool_pages.unwrap_or(self.buffer_pool_size / 2)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| DatabaseError::Config {
            details: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, or the defaults if it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).map_err(|e| DatabaseError::Config {
                details: format!("'{}': {}", path.display(), e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(DatabaseError::Io(e)),
        }
    }
}
