//! Matches a reconstructed trace against the project registry: which mutants
//! can the test suite reach at all?
//!
//! Unreached mutants never need a test execution; downstream schedulers drop
//! them from the run matrix up front.

use std::collections::BTreeSet;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::registry::{MutantActivationInfo, ProjectLevelMutationRegistry};

/// Reachability of one file's mutants.
#[derive(Debug, Clone, Serialize)]
pub struct FileCoverage {
    pub path: String,
    pub activation_signal_name: String,
    pub total: usize,
    pub reached: usize,
    /// Mutant ids no trace record mentioned, ascending.
    pub unreached: Vec<u64>,
}

/// Reachability of the whole project.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub total: usize,
    pub reached: usize,
    pub files: Vec<FileCoverage>,
}

impl CoverageReport {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.reached as f64 / self.total as f64 * 100.0
        }
    }

    pub fn fully_reached(&self) -> bool {
        self.reached == self.total
    }
}

/// Join a trace against the registry.
///
/// A trace record that names an unknown activation signal or a mutant id the
/// registry never issued is a hard error: it means the trace and registry are
/// from different instrumentation runs, and any coverage computed from the
/// pair would be wrong.
pub fn compute_coverage(
    registry: &ProjectLevelMutationRegistry,
    reached: &BTreeSet<MutantActivationInfo>,
) -> Result<CoverageReport> {
    for info in reached {
        let known = registry.files.values().any(|f| {
            f.activation_signal_name == info.activation_signal_name
                && f.mutations.contains_key(&info.mutant_id)
        });
        if !known {
            bail!(
                "trace record {info} does not match any registered mutant; \
                 trace and registry are from different instrumentation runs"
            );
        }
    }

    let mut files = Vec::with_capacity(registry.files.len());
    for (path, file) in &registry.files {
        let unreached: Vec<u64> = file
            .mutations
            .keys()
            .filter(|id| {
                !reached.contains(&MutantActivationInfo {
                    activation_signal_name: file.activation_signal_name.clone(),
                    mutant_id: **id,
                })
            })
            .copied()
            .collect();

        files.push(FileCoverage {
            path: path.clone(),
            activation_signal_name: file.activation_signal_name.clone(),
            total: file.mutations.len(),
            reached: file.mutations.len() - unreached.len(),
            unreached,
        });
    }

    Ok(CoverageReport {
        total: files.iter().map(|f| f.total).sum(),
        reached: files.iter().map(|f| f.reached).sum(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source_unit;
    use crate::registry::FileLevelSchemaRegistry;
    use crate::rewrite::instrument_unit;

    fn registry_for(code: &str) -> (ProjectLevelMutationRegistry, String) {
        let unit = parse_source_unit(code).unwrap();
        let mut file_registry = FileLevelSchemaRegistry::new("a.src");
        instrument_unit(&unit, &mut file_registry);
        let signal = file_registry.activation_signal_name().to_string();

        let mut project = ProjectLevelMutationRegistry::default();
        project.insert(file_registry.into_mutation_registry());
        (project, signal)
    }

    fn reached(signal: &str, ids: &[u64]) -> BTreeSet<MutantActivationInfo> {
        ids.iter()
            .map(|id| MutantActivationInfo {
                activation_signal_name: signal.to_string(),
                mutant_id: *id,
            })
            .collect()
    }

    #[test]
    fn partial_trace_lists_unreached_ids() {
        // `x > y` is the only site: 3 mutants.
        let (project, signal) = registry_for("fn f(x: i32, y: i32) -> bool { return x > y; }");
        let report = compute_coverage(&project, &reached(&signal, &[1, 3])).unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.reached, 2);
        assert!(!report.fully_reached());
        assert_eq!(report.files[0].unreached, vec![2]);
    }

    #[test]
    fn full_trace_reaches_everything() {
        let (project, signal) = registry_for("fn f(x: i32, y: i32) -> bool { return x > y; }");
        let report = compute_coverage(&project, &reached(&signal, &[1, 2, 3])).unwrap();
        assert!(report.fully_reached());
        assert_eq!(report.percent(), 100.0);
    }

    #[test]
    fn empty_registry_is_fully_covered() {
        let report =
            compute_coverage(&ProjectLevelMutationRegistry::default(), &BTreeSet::new()).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.percent(), 100.0);
    }

    #[test]
    fn unknown_signal_is_a_hard_error() {
        let (project, _) = registry_for("fn f(x: i32, y: i32) -> bool { return x > y; }");
        let err = compute_coverage(&project, &reached("OTHER_SIGNAL", &[1])).unwrap_err();
        assert!(format!("{err:#}").contains("different instrumentation runs"));
    }

    #[test]
    fn out_of_range_id_is_a_hard_error() {
        let (project, signal) = registry_for("fn f(x: i32, y: i32) -> bool { return x > y; }");
        assert!(compute_coverage(&project, &reached(&signal, &[99])).is_err());
    }
}
