use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::options::SOURCE_EXTENSION;
use crate::parse::parse_source_unit;
use crate::registry::FileLevelSchemaRegistry;
use crate::rewrite::instrument_unit;

/// Mutation-site overview of one source file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOverview {
    /// Path relative to the scanned root.
    pub path: PathBuf,

    /// Number of functions in the file.
    pub functions: usize,

    /// Number of mutation sites.
    pub sites: usize,

    /// Number of mutants across all sites.
    pub mutants: u64,

    /// Number of distinct dispatch routines (structurally deduplicated).
    pub routines: usize,

    /// Site counts keyed by the original operation's record name.
    pub sites_by_operation: BTreeMap<String, usize>,
}

/// Mutation-site overview of a whole source tree.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    /// Absolute or as-given root of the scan.
    pub root: PathBuf,

    pub files: Vec<FileOverview>,

    pub total_sites: usize,
    pub total_mutants: u64,
}

/// All surface-language source files under `root`, as paths relative to it,
/// in deterministic order.
pub fn collect_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory {dir:?}"))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read directory {dir:?}"))?;
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            walk(root, &path, files)?;
        } else if path.extension().is_some_and(|e| e == SOURCE_EXTENSION) {
            let rel = path
                .strip_prefix(root)
                .with_context(|| format!("path {path:?} escapes scan root {root:?}"))?;
            files.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// Scan one file: parse it and run a throwaway instrumentation pass to count
/// what the real pass would register.
pub fn scan_file(root: &Path, rel: &Path) -> Result<FileOverview> {
    let path = root.join(rel);
    let code =
        fs::read_to_string(&path).with_context(|| format!("failed to read source {path:?}"))?;
    let unit =
        parse_source_unit(&code).with_context(|| format!("failed to parse source {path:?}"))?;

    let mut registry = FileLevelSchemaRegistry::new(rel);
    instrument_unit(&unit, &mut registry);

    let mut sites_by_operation = BTreeMap::new();
    for (_, group) in registry.sites() {
        *sites_by_operation
            .entry(group.original.operation.record_name())
            .or_insert(0) += 1;
    }

    Ok(FileOverview {
        path: rel.to_path_buf(),
        functions: unit.functions.len(),
        sites: registry.site_count(),
        mutants: registry.mutant_count(),
        routines: registry.routines().len(),
        sites_by_operation,
    })
}

/// Scan every source file under `root` and aggregate the overview.
pub fn scan_project(root: &Path) -> Result<ProjectOverview> {
    let rels = collect_source_files(root)?;
    if rels.is_empty() {
        bail!("no .{SOURCE_EXTENSION} files found under {root:?}");
    }

    let mut files = Vec::with_capacity(rels.len());
    for rel in rels {
        files.push(scan_file(root, &rel)?);
    }

    let total_sites = files.iter().map(|f| f.sites).sum();
    let total_mutants = files.iter().map(|f| f.mutants).sum();

    Ok(ProjectOverview {
        root: root.to_path_buf(),
        files,
        total_sites,
        total_mutants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_src(root: &Path, rel: &str, code: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, code).unwrap();
    }

    #[test]
    fn collects_source_files_recursively_and_sorted() {
        let dir = tempdir().unwrap();
        write_src(dir.path(), "b.src", "fn f() {}");
        write_src(dir.path(), "sub/a.src", "fn g() {}");
        write_src(dir.path(), "notes.txt", "not source");
        write_src(dir.path(), ".hidden/c.src", "fn h() {}");

        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("b.src"), PathBuf::from("sub/a.src")]
        );
    }

    #[test]
    fn scan_counts_sites_by_operation() {
        let dir = tempdir().unwrap();
        write_src(
            dir.path(),
            "m.src",
            "\
fn check(x: i32, y: i32) -> bool {
    return x > y;
}

fn sum(a: i32, b: i32) -> i32 {
    return a + b;
}
",
        );

        let overview = scan_file(dir.path(), Path::new("m.src")).unwrap();
        assert_eq!(overview.functions, 2);
        assert_eq!(overview.sites, 2);
        assert_eq!(overview.sites_by_operation["GreaterThan"], 1);
        assert_eq!(overview.sites_by_operation["Add"], 1);
        // 3 comparison mutants + 4 arithmetic mutants.
        assert_eq!(overview.mutants, 7);
        assert_eq!(overview.routines, 2);
    }

    #[test]
    fn project_scan_aggregates_files() {
        let dir = tempdir().unwrap();
        write_src(dir.path(), "a.src", "fn f(x: i32) -> bool { return x > 0; }");
        write_src(dir.path(), "b.src", "fn g(p: bool) -> bool { return !p; }");

        let overview = scan_project(dir.path()).unwrap();
        assert_eq!(overview.files.len(), 2);
        // a.src: literal 0 (2 mutants) + `>` (3); b.src: nothing.
        assert_eq!(overview.total_sites, 2);
        assert_eq!(overview.total_mutants, 5);
    }

    #[test]
    fn empty_tree_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(scan_project(dir.path()).is_err());
    }
}
