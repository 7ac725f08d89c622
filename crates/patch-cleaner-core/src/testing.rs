//! In-memory stand-ins for the platform capabilities.

use crate::error::{CleanerError, CleanerResult};
use crate::native::matches_pattern;
use crate::platform::{
    AppliedPatch, CacheFileSystem, CacheLocator, Enumerated, InstallerRegistry, ListedFile,
    PatchCode, ProductCode, PropertyRead,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

pub struct FakeLocator {
    dir: Option<PathBuf>,
}

impl FakeLocator {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    pub fn unavailable() -> Self {
        Self { dir: None }
    }
}

impl CacheLocator for FakeLocator {
    fn cache_dir(&self) -> CleanerResult<PathBuf> {
        self.dir
            .clone()
            .ok_or_else(|| CleanerError::LocationUnavailable("known folder lookup failed".to_string()))
    }
}

/// A single flat directory of files.
pub struct FakeFileSystem {
    dir: PathBuf,
    files: RefCell<BTreeMap<String, u64>>,
    locked: HashSet<String>,
}

impl FakeFileSystem {
    pub fn new(dir: impl Into<PathBuf>, files: &[(&str, u64)]) -> Self {
        Self {
            dir: dir.into(),
            files: RefCell::new(files.iter().map(|(n, s)| (n.to_string(), *s)).collect()),
            locked: HashSet::new(),
        }
    }

    pub fn locking(mut self, name: &str) -> Self {
        self.locked.insert(name.to_string());
        self
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    fn name_in_dir(&self, path: &Path) -> Option<String> {
        if path.parent()? != self.dir {
            return None;
        }
        Some(path.file_name()?.to_string_lossy().into_owned())
    }
}

impl CacheFileSystem for FakeFileSystem {
    fn is_dir(&self, dir: &Path) -> bool {
        dir == self.dir
    }

    fn list(&self, dir: &Path, pattern: &str) -> io::Result<Vec<ListedFile>> {
        if dir != self.dir {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(self
            .files
            .borrow()
            .iter()
            .filter(|(name, _)| matches_pattern(pattern, name))
            .map(|(name, size)| ListedFile {
                name: name.clone(),
                size: *size,
            })
            .collect())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let name = self
            .name_in_dir(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        if self.locked.contains(&name) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is in use by another process",
            ));
        }
        self.files
            .borrow_mut()
            .remove(&name)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

pub struct FakePatch {
    code: String,
    local_package: Option<String>,
}

impl FakePatch {
    pub fn new(code: &str, local_package: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            local_package: local_package.map(str::to_string),
        }
    }
}

pub struct FakeProduct {
    code: String,
    local_package: Option<String>,
    patches: Vec<FakePatch>,
}

impl FakeProduct {
    pub fn new(code: &str, local_package: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            local_package: local_package.map(str::to_string),
            patches: Vec::new(),
        }
    }

    pub fn with_patches(mut self, patches: Vec<FakePatch>) -> Self {
        self.patches = patches;
        self
    }
}

/// Answers lookups the way the installer does: a value longer than the
/// offered capacity yields `BufferTooSmall` with the needed length.
pub struct FakeRegistry {
    products: Vec<FakeProduct>,
    product_failure: Option<(u32, u32)>,
    patch_failure: Option<(String, u32, u32)>,
    capacities: RefCell<Vec<usize>>,
    patch_capacities: RefCell<Vec<usize>>,
}

impl FakeRegistry {
    pub fn new(products: Vec<FakeProduct>) -> Self {
        Self {
            products,
            product_failure: None,
            patch_failure: None,
            capacities: RefCell::new(Vec::new()),
            patch_capacities: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_product_at(mut self, index: u32, code: u32) -> Self {
        self.product_failure = Some((index, code));
        self
    }

    pub fn failing_patch_at(mut self, product: &str, index: u32, code: u32) -> Self {
        self.patch_failure = Some((product.to_string(), index, code));
        self
    }

    /// Capacities offered to product package lookups, in call order.
    pub fn lookup_capacities(&self) -> Vec<usize> {
        self.capacities.borrow().clone()
    }

    /// Capacities offered to patch package lookups, in call order.
    pub fn patch_lookup_capacities(&self) -> Vec<usize> {
        self.patch_capacities.borrow().clone()
    }

    fn sized(value: Option<&String>, capacity: usize) -> PropertyRead {
        match value {
            None => PropertyRead::Unavailable(1605),
            Some(value) => {
                let required = value.chars().count();
                if required > capacity {
                    PropertyRead::BufferTooSmall { required }
                } else {
                    PropertyRead::Value(value.clone())
                }
            }
        }
    }
}

impl InstallerRegistry for FakeRegistry {
    fn product_at(&self, index: u32) -> Enumerated<ProductCode> {
        if let Some((at, code)) = self.product_failure {
            if at == index {
                return Enumerated::Failed(code);
            }
        }
        match self.products.get(index as usize) {
            Some(p) => Enumerated::Item(ProductCode(p.code.clone())),
            None => Enumerated::NoMoreItems,
        }
    }

    fn patch_at(&self, product: &ProductCode, index: u32) -> Enumerated<AppliedPatch> {
        if let Some((at_product, at, code)) = &self.patch_failure {
            if *at_product == product.0 && *at == index {
                return Enumerated::Failed(*code);
            }
        }
        let patch = self
            .products
            .iter()
            .find(|p| p.code == product.0)
            .and_then(|p| p.patches.get(index as usize));
        match patch {
            Some(patch) => Enumerated::Item(AppliedPatch {
                code: PatchCode(patch.code.clone()),
                transforms: String::new(),
            }),
            None => Enumerated::NoMoreItems,
        }
    }

    fn product_local_package(&self, product: &ProductCode, capacity: usize) -> PropertyRead {
        self.capacities.borrow_mut().push(capacity);
        let value = self
            .products
            .iter()
            .find(|p| p.code == product.0)
            .and_then(|p| p.local_package.as_ref());
        Self::sized(value, capacity)
    }

    fn patch_local_package(&self, patch: &PatchCode, capacity: usize) -> PropertyRead {
        self.patch_capacities.borrow_mut().push(capacity);
        let value = self
            .products
            .iter()
            .flat_map(|p| p.patches.iter())
            .find(|p| p.code == patch.0)
            .and_then(|p| p.local_package.as_ref());
        Self::sized(value, capacity)
    }
}
