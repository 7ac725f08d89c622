use crate::path_key::PathKey;
use crate::platform::{Enumerated, InstallerRegistry, PropertyRead};
use std::collections::HashSet;
use std::path::Path;

const MAX_LOOKUP_ATTEMPTS: usize = 4;

/// Cached package and patch files still referenced by the installer.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    paths: HashSet<PathKey>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathKey>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(&PathKey::from(path))
    }

    pub fn contains_key(&self, key: &PathKey) -> bool {
        self.paths.contains(key)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Runs a sized property lookup, growing the buffer whenever the lookup
/// reports that the value did not fit.
///
/// Returns `None` when the property is missing, empty, or keeps outgrowing
/// the buffer.
pub fn read_property(
    initial_capacity: usize,
    mut lookup: impl FnMut(usize) -> PropertyRead,
) -> Option<String> {
    let mut capacity = initial_capacity.max(1);
    for _ in 0..MAX_LOOKUP_ATTEMPTS {
        match lookup(capacity) {
            PropertyRead::Value(value) if value.is_empty() => return None,
            PropertyRead::Value(value) => return Some(value),
            PropertyRead::BufferTooSmall { required } if required > capacity => {
                tracing::debug!(capacity, required, "property lookup needs a larger buffer");
                capacity = required;
            }
            PropertyRead::BufferTooSmall { required } => {
                tracing::warn!(capacity, required, "property lookup reported a size that does not grow");
                return None;
            }
            PropertyRead::Unavailable(code) => {
                tracing::debug!(code, "property unavailable");
                return None;
            }
        }
    }
    tracing::warn!(capacity, "property lookup kept outgrowing its buffer");
    None
}

pub struct ReferenceCollector<'a, R: InstallerRegistry> {
    registry: &'a R,
    lookup_capacity: usize,
}

impl<'a, R: InstallerRegistry> ReferenceCollector<'a, R> {
    pub fn new(registry: &'a R, lookup_capacity: usize) -> Self {
        Self {
            registry,
            lookup_capacity,
        }
    }

    /// Walks every registered product and its applied patches.
    ///
    /// Enumeration failures end the affected enumeration early and are only
    /// logged; a shorter reference set can only add orphan candidates.
    pub fn collect(&self) -> ReferenceSet {
        let mut refs = ReferenceSet::new();
        let mut products = 0usize;
        let mut patches = 0usize;

        for index in 0.. {
            let product = match self.registry.product_at(index) {
                Enumerated::Item(product) => product,
                Enumerated::NoMoreItems => break,
                Enumerated::Failed(code) => {
                    tracing::warn!(code, index, "product enumeration failed");
                    break;
                }
            };
            products += 1;

            match read_property(self.lookup_capacity, |capacity| {
                self.registry.product_local_package(&product, capacity)
            }) {
                Some(path) => {
                    refs.insert(path.as_str());
                }
                None => tracing::debug!(product = %product, "product has no local package"),
            }

            for patch_index in 0.. {
                let patch = match self.registry.patch_at(&product, patch_index) {
                    Enumerated::Item(patch) => patch,
                    Enumerated::NoMoreItems => break,
                    Enumerated::Failed(code) => {
                        tracing::warn!(code, product = %product, index = patch_index, "patch enumeration failed");
                        break;
                    }
                };
                patches += 1;

                match read_property(self.lookup_capacity, |capacity| {
                    self.registry.patch_local_package(&patch.code, capacity)
                }) {
                    Some(path) => {
                        refs.insert(path.as_str());
                    }
                    None => tracing::debug!(patch = %patch.code, "patch has no local package"),
                }
            }
        }

        tracing::info!(products, patches, referenced = refs.len(), "collected installer references");
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePatch, FakeProduct, FakeRegistry};

    #[test]
    fn collects_packages_and_patches() {
        let registry = FakeRegistry::new(vec![
            FakeProduct::new("{P1}", Some(r"C:\Windows\Installer\a.msi")).with_patches(vec![
                FakePatch::new("{X1}", Some(r"C:\Windows\Installer\x.msp")),
            ]),
            FakeProduct::new("{P2}", Some(r"C:\Windows\Installer\b.msi")),
        ]);

        let refs = ReferenceCollector::new(&registry, 260).collect();
        assert_eq!(refs.len(), 3);
        assert!(refs.contains(Path::new(r"c:\windows\installer\A.MSI")));
        assert!(refs.contains(Path::new(r"C:\Windows\Installer\x.msp")));
    }

    #[test]
    fn unresolvable_packages_contribute_nothing() {
        let registry = FakeRegistry::new(vec![
            FakeProduct::new("{P1}", None)
                .with_patches(vec![FakePatch::new("{X1}", None), FakePatch::new("{X2}", Some("x2.msp"))]),
            FakeProduct::new("{P2}", Some("")),
        ]);

        let refs = ReferenceCollector::new(&registry, 260).collect();
        assert_eq!(refs.len(), 1);
        assert!(refs.contains(Path::new("x2.msp")));
    }

    #[test]
    fn product_enumeration_failure_truncates() {
        let registry = FakeRegistry::new(vec![
            FakeProduct::new("{P1}", Some("a.msi")),
            FakeProduct::new("{P2}", Some("b.msi")),
        ])
        .failing_product_at(1, 1610);

        let refs = ReferenceCollector::new(&registry, 260).collect();
        assert!(refs.contains(Path::new("a.msi")));
        assert!(!refs.contains(Path::new("b.msi")));
    }

    #[test]
    fn patch_enumeration_failure_moves_to_next_product() {
        let registry = FakeRegistry::new(vec![
            FakeProduct::new("{P1}", Some("a.msi")).with_patches(vec![
                FakePatch::new("{X1}", Some("x1.msp")),
                FakePatch::new("{X2}", Some("x2.msp")),
            ]),
            FakeProduct::new("{P2}", Some("b.msi")),
        ])
        .failing_patch_at("{P1}", 1, 1605);

        let refs = ReferenceCollector::new(&registry, 260).collect();
        assert!(refs.contains(Path::new("x1.msp")));
        assert!(!refs.contains(Path::new("x2.msp")));
        assert!(refs.contains(Path::new("b.msi")));
    }

    #[test]
    fn long_paths_are_retried_with_required_size() {
        let long = format!(r"C:\Windows\Installer\{}.msi", "d".repeat(300));
        let registry = FakeRegistry::new(vec![FakeProduct::new("{P1}", Some(long.as_str()))]);

        let refs = ReferenceCollector::new(&registry, 260).collect();
        assert!(refs.contains(Path::new(&long)));
        assert_eq!(registry.lookup_capacities(), vec![260, long.chars().count()]);
    }

    #[test]
    fn long_patch_paths_are_retried_with_required_size() {
        let long = format!(r"C:\Windows\Installer\{}.msp", "e".repeat(280));
        let registry = FakeRegistry::new(vec![FakeProduct::new("{P1}", Some("a.msi"))
            .with_patches(vec![
                FakePatch::new("{X1}", Some(long.as_str())),
                FakePatch::new("{X2}", Some("short.msp")),
            ])]);

        let refs = ReferenceCollector::new(&registry, 260).collect();
        assert!(refs.contains(Path::new(&long)));
        assert!(refs.contains(Path::new("short.msp")));
        assert_eq!(registry.patch_lookup_capacities(), vec![260, long.chars().count(), 260]);
    }

    #[test]
    fn read_property_gives_up_on_non_growing_size() {
        let mut calls = 0;
        let value = read_property(10, |_| {
            calls += 1;
            PropertyRead::BufferTooSmall { required: 5 }
        });
        assert_eq!(value, None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn read_property_bounds_attempts() {
        let mut calls = 0;
        let value = read_property(1, |capacity| {
            calls += 1;
            PropertyRead::BufferTooSmall { required: capacity * 2 }
        });
        assert_eq!(value, None);
        assert_eq!(calls, MAX_LOOKUP_ATTEMPTS);
    }
}
