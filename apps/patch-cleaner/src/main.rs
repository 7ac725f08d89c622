use anyhow::Context;
use patch_cleaner_core::logging::{format_error_chain, init_logging};
use patch_cleaner_core::{format_size, CleanerConfig, NativeCleaner};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.json";

fn config_path() -> Option<PathBuf> {
    let local = std::env::var_os("LOCALAPPDATA")?;
    Some(PathBuf::from(local).join("PatchCleaner").join(CONFIG_FILE))
}

fn load_config() -> anyhow::Result<CleanerConfig> {
    match config_path() {
        Some(path) => CleanerConfig::load_or_default(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => Ok(CleanerConfig::default()),
    }
}

fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let mut cleaner = NativeCleaner::native(config)?;
    let dir = cleaner.cache_dir()?;
    let result = cleaner.refresh()?;

    println!("{}", dir.display());
    for entry in result.entries() {
        println!("{:>10}  {}", format_size(entry.size), entry.path.display());
    }
    println!(
        "{} orphaned file(s), {}",
        result.len(),
        format_size(result.total_size())
    );
    Ok(())
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        let source: &(dyn std::error::Error + 'static) = e.as_ref();
        let chain = format_error_chain(source);
        tracing::error!(error = %chain, "patch cleaner failed");
        std::process::exit(1);
    }
}
