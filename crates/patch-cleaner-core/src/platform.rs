//! Capabilities the cleaner consumes from the operating system.
//!
//! Everything platform-specific sits behind these traits; `native` holds the
//! Windows implementations and `testing` the in-memory ones.

use crate::error::CleanerResult;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Resolves the directory holding cached installer packages.
pub trait CacheLocator {
    fn cache_dir(&self) -> CleanerResult<PathBuf>;
}

/// One directory entry matched by a listing pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub size: u64,
}

pub trait CacheFileSystem {
    fn is_dir(&self, dir: &Path) -> bool {
        dir.is_dir()
    }

    /// Lists regular files directly inside `dir` whose name matches `pattern`.
    fn list(&self, dir: &Path, pattern: &str) -> io::Result<Vec<ListedFile>>;

    fn remove(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductCode(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchCode(pub String);

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PatchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub code: PatchCode,
    pub transforms: String,
}

/// Outcome of reading one slot of an index-based enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enumerated<T> {
    Item(T),
    NoMoreItems,
    /// Raw installer error code.
    Failed(u32),
}

/// Outcome of a single property lookup into a caller-sized buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyRead {
    Value(String),
    /// The value needs `required` characters, excluding the terminator.
    BufferTooSmall { required: usize },
    Unavailable(u32),
}

/// The installer subsystem's table of registered products and patches.
pub trait InstallerRegistry {
    fn product_at(&self, index: u32) -> Enumerated<ProductCode>;

    fn patch_at(&self, product: &ProductCode, index: u32) -> Enumerated<AppliedPatch>;

    fn product_local_package(&self, product: &ProductCode, capacity: usize) -> PropertyRead;

    fn patch_local_package(&self, patch: &PatchCode, capacity: usize) -> PropertyRead;
}
