pub mod config;
pub mod error;
pub mod logging;
pub mod native;
pub mod path_key;
pub mod platform;
pub mod references;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod size;

#[cfg(test)]
pub(crate) mod testing;

pub use config::CleanerConfig;
pub use error::{CleanerError, CleanerResult};
pub use path_key::PathKey;
pub use resolver::{DeleteOutcome, DeleteReport, OrphanEntry, OrphanResult, Selection};
pub use scanner::{CacheIndex, CacheScanner};
pub use references::{ReferenceCollector, ReferenceSet};
pub use session::{NativeCleaner, PatchCleaner};
pub use size::format_size;
