use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::registry::ProjectLevelMutationRegistry;

/// File name of the project-level registry inside the output directory.
pub const REGISTRY_FILE_NAME: &str = "registry.json";

/// Write one instrumented source file under `out_dir`, mirroring its
/// path relative to the source root. Returns the written path.
pub fn write_instrumented_source(out_dir: &Path, rel: &Path, contents: &str) -> Result<PathBuf> {
    let path = out_dir.join(rel);
    write_atomic(&path, contents.as_bytes())?;
    Ok(path)
}

/// Write the project-level registry as pretty JSON. Returns the written path.
pub fn write_registry_json(
    out_dir: &Path,
    registry: &ProjectLevelMutationRegistry,
) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(registry).context("serialize registry to json")?;
    let path = out_dir.join(REGISTRY_FILE_NAME);
    write_atomic(&path, json.as_bytes())?;
    Ok(path)
}

/// Atomic write: the file either has its previous contents or the new ones,
/// never a partial mix. The temp file lives next to the target so the final
/// rename stays on one filesystem; it cleans itself up on failure.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("output path {path:?} has no parent directory"))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create output directory {parent:?}"))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {parent:?}"))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {path:?}"))?;
    tmp.persist(path)
        .with_context(|| format!("failed to move temp file into place at {path:?}"))?;
    Ok(())
}
