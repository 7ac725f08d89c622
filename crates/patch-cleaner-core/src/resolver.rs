use crate::error::{CleanerError, CleanerResult};
use crate::path_key::PathKey;
use crate::platform::CacheFileSystem;
use crate::references::ReferenceSet;
use crate::scanner::CacheIndex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// Cached files no installed product or patch refers to, in path order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanResult {
    total_size: u64,
    entries: Vec<OrphanEntry>,
    #[serde(skip)]
    positions: HashMap<PathKey, usize>,
}

impl OrphanResult {
    pub fn entries(&self) -> &[OrphanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn get(&self, path: &Path) -> Option<&OrphanEntry> {
        self.positions
            .get(&PathKey::from(path))
            .map(|&i| &self.entries[i])
    }
}

/// `index` minus every path in `refs`.
pub fn resolve(index: CacheIndex, refs: &ReferenceSet) -> OrphanResult {
    let mut result = OrphanResult::default();
    for (key, size) in index {
        if refs.contains_key(&key) {
            continue;
        }
        result.positions.insert(key.clone(), result.entries.len());
        result.total_size += size;
        result.entries.push(OrphanEntry {
            path: key.into_path(),
            size,
        });
    }
    result
}

/// Checked entries of one result with a running size total.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: BTreeMap<PathKey, u64>,
    aggregate: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` selected or not and returns the new aggregate size.
    ///
    /// Re-applying the current state is a no-op.
    pub fn toggle(&mut self, result: &OrphanResult, path: &Path, selected: bool) -> CleanerResult<u64> {
        let entry = result
            .get(path)
            .ok_or_else(|| CleanerError::NotAnOrphan(path.to_path_buf()))?;
        let key = PathKey::new(entry.path.clone());

        if selected {
            if self.selected.insert(key, entry.size).is_none() {
                self.aggregate += entry.size;
            }
        } else if let Some(size) = self.selected.remove(&key) {
            self.aggregate -= size;
        }
        Ok(self.aggregate)
    }

    pub fn select_all(&mut self, result: &OrphanResult) -> u64 {
        self.selected = result
            .entries()
            .iter()
            .map(|e| (PathKey::new(e.path.clone()), e.size))
            .collect();
        self.aggregate = result.total_size();
        self.aggregate
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.aggregate = 0;
    }

    pub fn aggregate_size(&self) -> u64 {
        self.aggregate
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.selected.contains_key(&PathKey::from(path))
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.selected.keys().map(|k| k.path().to_path_buf()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Refused: the path is not an entry of the result being acted on.
    NotAnOrphan,
    Failed { message: String, os_code: Option<i32> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub path: PathBuf,
    pub outcome: DeleteOutcome,
}

impl DeleteReport {
    pub fn is_deleted(&self) -> bool {
        self.outcome == DeleteOutcome::Deleted
    }
}

/// Deletes the requested entries of `result`, each independently; one
/// failure never stops the batch.
///
/// Requests are matched against `result` ignoring case and only the stored
/// entry path is ever removed. Anything else is reported as `NotAnOrphan`
/// and left alone. Repeated requests for the same entry are reported once.
pub fn delete_orphans<F, I>(fs: &F, result: &OrphanResult, paths: I) -> Vec<DeleteReport>
where
    F: CacheFileSystem,
    I: IntoIterator<Item = PathBuf>,
{
    let mut seen = HashSet::new();
    let mut reports = Vec::new();

    for requested in paths {
        if !seen.insert(PathKey::new(requested.clone())) {
            continue;
        }
        let Some(entry) = result.get(&requested) else {
            tracing::warn!(path = %requested.display(), "refusing to delete a path that is not an orphan");
            reports.push(DeleteReport {
                path: requested,
                outcome: DeleteOutcome::NotAnOrphan,
            });
            continue;
        };

        let path = entry.path.clone();
        let outcome = match fs.remove(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "deleted orphaned cache file");
                DeleteOutcome::Deleted
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to delete cache file");
                DeleteOutcome::Failed {
                    message: e.to_string(),
                    os_code: e.raw_os_error(),
                }
            }
        };
        reports.push(DeleteReport { path, outcome });
    }

    let failed = reports.iter().filter(|r| !r.is_deleted()).count();
    tracing::info!(requested = reports.len(), failed, "delete batch finished");
    reports
}
