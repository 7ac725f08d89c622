use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// A path compared, ordered and hashed by its components, without regard to
/// letter case, separator style or `.` segments.
///
/// The caller's spelling is kept for display and for filesystem calls.
#[derive(Debug, Clone)]
pub struct PathKey {
    path: PathBuf,
    folded: String,
}

impl PathKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let folded = fold(&path);
        Self { path, folded }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

fn fold(path: &Path) -> String {
    let mut folded = String::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Prefix(prefix) => folded.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => folded.push('/'),
            Component::ParentDir | Component::Normal(_) => {
                if !folded.is_empty() && !folded.ends_with('/') {
                    folded.push('/');
                }
                folded.push_str(&component.as_os_str().to_string_lossy());
            }
        }
    }
    folded.to_lowercase()
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for PathKey {}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<&Path> for PathKey {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for PathKey {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for PathKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
