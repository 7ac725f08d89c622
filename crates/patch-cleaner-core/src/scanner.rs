use crate::error::{CleanerError, CleanerResult};
use crate::path_key::PathKey;
use crate::platform::CacheFileSystem;
use std::collections::btree_map::{self, BTreeMap};
use std::path::{Path, PathBuf};

/// Cached files keyed by case-insensitive path, iterated in path order.
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    files: BTreeMap<PathKey, u64>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first size recorded for a path.
    pub fn insert(&mut self, path: PathBuf, size: u64) -> bool {
        match self.files.entry(PathKey::new(path)) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(size);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn size_of(&self, path: &Path) -> Option<u64> {
        self.files.get(&PathKey::from(path)).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, u64)> {
        self.files.iter().map(|(k, v)| (k, *v))
    }
}

impl IntoIterator for CacheIndex {
    type Item = (PathKey, u64);
    type IntoIter = btree_map::IntoIter<PathKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

pub struct CacheScanner<'a, F: CacheFileSystem> {
    fs: &'a F,
}

impl<'a, F: CacheFileSystem> CacheScanner<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Indexes every file directly inside `dir` matching one of `patterns`.
    pub fn scan(&self, dir: &Path, patterns: &[String]) -> CleanerResult<CacheIndex> {
        if !self.fs.is_dir(dir) {
            return Err(CleanerError::LocationUnavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut index = CacheIndex::new();
        for pattern in patterns {
            let listed = self.fs.list(dir, pattern)?;
            tracing::debug!(pattern = %pattern, matched = listed.len(), "listed cache files");
            for file in listed {
                let path = dir.join(&file.name);
                if !index.insert(path, file.size) {
                    tracing::debug!(name = %file.name, "file matched more than one pattern");
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            files = index.len(),
            bytes = index.total_size(),
            "scanned installer cache"
        );
        Ok(index)
    }
}
