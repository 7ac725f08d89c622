use crate::error::{CleanerError, CleanerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Capacity of the first property lookup attempt, in UTF-16 units.
pub const DEFAULT_LOOKUP_CAPACITY: usize = 260;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Scans this directory instead of `<Windows>\Installer`.
    pub cache_dir: Option<PathBuf>,
    pub patterns: Vec<String>,
    pub lookup_capacity: usize,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            patterns: vec!["*.msi".to_string(), "*.msp".to_string()],
            lookup_capacity: DEFAULT_LOOKUP_CAPACITY,
        }
    }
}

impl CleanerConfig {
    pub fn load(path: &Path) -> CleanerResult<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: CleanerConfig = serde_json::from_str(&data)?;
        Ok(cfg)
    }

    pub fn load_or_default(path: &Path) -> CleanerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> CleanerResult<()> {
        if let Some(dir) = &self.cache_dir {
            if !dir.is_absolute() {
                return Err(CleanerError::Config(format!(
                    "cache_dir must be absolute: {}",
                    dir.display()
                )));
            }
        }
        if self.patterns.is_empty() {
            return Err(CleanerError::Config("at least one pattern is required".to_string()));
        }
        if self.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(CleanerError::Config("patterns must not be blank".to_string()));
        }
        if self.lookup_capacity == 0 {
            return Err(CleanerError::Config("lookup_capacity must be positive".to_string()));
        }
        Ok(())
    }
}
