use crate::config::CleanerConfig;
use crate::error::{CleanerError, CleanerResult};
use crate::native::{KnownFolderLocator, MsiRegistry, NativeFileSystem};
use crate::platform::{CacheFileSystem, CacheLocator, InstallerRegistry};
use crate::references::ReferenceCollector;
use crate::resolver::{delete_orphans, resolve, DeleteReport, OrphanResult, Selection};
use crate::scanner::CacheScanner;
use std::path::{Path, PathBuf};

/// One refresh cycle of the cleaner: the latest orphan result and the
/// user's selection over it.
///
/// Both are dropped whenever the cache may have changed, so a result is
/// never patched in place.
pub struct PatchCleaner<L, F, R> {
    config: CleanerConfig,
    locator: L,
    fs: F,
    registry: R,
    current: Option<OrphanResult>,
    selection: Selection,
}

pub type NativeCleaner = PatchCleaner<KnownFolderLocator, NativeFileSystem, MsiRegistry>;

impl NativeCleaner {
    pub fn native(config: CleanerConfig) -> CleanerResult<Self> {
        Ok(Self::new(config, KnownFolderLocator, NativeFileSystem, MsiRegistry::new()?))
    }
}

impl<L, F, R> PatchCleaner<L, F, R>
where
    L: CacheLocator,
    F: CacheFileSystem,
    R: InstallerRegistry,
{
    pub fn new(config: CleanerConfig, locator: L, fs: F, registry: R) -> Self {
        Self {
            config,
            locator,
            fs,
            registry,
            current: None,
            selection: Selection::new(),
        }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> CleanerResult<PathBuf> {
        match &self.config.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => self.locator.cache_dir(),
        }
    }

    /// Rescans the cache and the installer registry from scratch.
    ///
    /// Only an unusable cache location (or bad config) fails the refresh;
    /// registry problems shrink the reference set instead.
    pub fn refresh(&mut self) -> CleanerResult<&OrphanResult> {
        self.current = None;
        self.selection.clear();

        self.config.validate()?;
        let dir = self.cache_dir()?;
        let index = CacheScanner::new(&self.fs).scan(&dir, &self.config.patterns)?;
        let refs = ReferenceCollector::new(&self.registry, self.config.lookup_capacity).collect();
        let result = resolve(index, &refs);

        tracing::info!(
            orphans = result.len(),
            bytes = result.total_size(),
            "refresh complete"
        );
        Ok(&*self.current.insert(result))
    }

    pub fn result(&self) -> Option<&OrphanResult> {
        self.current.as_ref()
    }

    pub fn toggle_selection(&mut self, path: &Path, selected: bool) -> CleanerResult<u64> {
        let result = self
            .current
            .as_ref()
            .ok_or_else(|| CleanerError::NotAnOrphan(path.to_path_buf()))?;
        self.selection.toggle(result, path, selected)
    }

    pub fn select_all(&mut self) -> u64 {
        match &self.current {
            Some(result) => self.selection.select_all(result),
            None => 0,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected_size(&self) -> u64 {
        self.selection.aggregate_size()
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.selection.paths()
    }

    pub fn delete_selected(&mut self) -> Vec<DeleteReport> {
        let paths = self.selection.paths();
        self.delete_paths(paths)
    }

    /// Deletes those of `paths` that are orphans of the current result and
    /// invalidates it; call [`refresh`](Self::refresh) afterwards to see what
    /// is left.
    ///
    /// Without a current result every request is refused.
    pub fn delete_paths<I>(&mut self, paths: I) -> Vec<DeleteReport>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let empty = OrphanResult::default();
        let result = self.current.as_ref().unwrap_or(&empty);
        let reports = delete_orphans(&self.fs, result, paths);
        self.current = None;
        self.selection.clear();
        reports
    }
}
