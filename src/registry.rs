use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::group::MutationGroup;
use crate::span::{LineSpan, SourceSpan};

/// Process-wide file-id counter. The only state shared between concurrently
/// instrumented files; everything else lives in one file's registry.
static NEXT_FILE_ID: AtomicU32 = AtomicU32::new(0);

fn next_file_id() -> u32 {
    NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Mutable per-file build state of the schema engine.
///
/// Owns the mutant-id generator, the structural dedup map (group to routine
/// suffix), and the site map (base id to group). Lives exactly as long as one
/// file's rewrite; [`FileLevelSchemaRegistry::into_mutation_registry`]
/// converts it into the immutable snapshot.
#[derive(Debug)]
pub struct FileLevelSchemaRegistry {
    file_relative_path: PathBuf,
    schema_class_name: String,
    activation_signal_name: String,
    /// Next free mutant id; ids start at 1.
    next_mutant_id: u64,
    /// Structural dedup: identical groups share one generated routine.
    suffix_ids: HashMap<MutationGroup, u32>,
    next_suffix_id: u32,
    /// Every registered site, including structural repeats.
    sites: BTreeMap<u64, MutationGroup>,
}

impl FileLevelSchemaRegistry {
    /// Create the registry for one file, drawing a fresh process-wide file id
    /// to derive the schema class and activation signal names.
    pub fn new(file_relative_path: impl Into<PathBuf>) -> Self {
        let file_id = next_file_id();
        Self {
            file_relative_path: file_relative_path.into(),
            schema_class_name: format!("MutantSchemata{file_id}"),
            activation_signal_name: format!("SCHEMA_MUTANT_ACTIVE_{file_id}"),
            next_mutant_id: 1,
            suffix_ids: HashMap::new(),
            next_suffix_id: 0,
            sites: BTreeMap::new(),
        }
    }

    pub fn file_relative_path(&self) -> &Path {
        &self.file_relative_path
    }

    pub fn schema_class_name(&self) -> &str {
        &self.schema_class_name
    }

    pub fn activation_signal_name(&self) -> &str {
        &self.activation_signal_name
    }

    /// Register one mutation site and return its base id.
    ///
    /// The site receives the id range `[base, base + mutants)`; the generator
    /// advances by exactly the candidate count, so ranges across sites are
    /// pairwise disjoint and tile `[1, next_id)` with no gaps. Structural
    /// repeats reuse the existing routine suffix but still get their own
    /// id range.
    pub fn register(&mut self, group: MutationGroup) -> u64 {
        let base_id = self.next_mutant_id;

        if !self.suffix_ids.contains_key(&group) {
            self.suffix_ids.insert(group.clone(), self.next_suffix_id);
            self.next_suffix_id += 1;
        }

        self.next_mutant_id += group.mutant_count();
        self.sites.insert(base_id, group);

        base_id
    }

    /// Name of the generated dispatch routine handling this group.
    ///
    /// Only valid for groups that were registered; unknown groups are a
    /// programming fault in the rewriter.
    pub fn dispatch_routine_name(&self, group: &MutationGroup) -> String {
        let suffix = self
            .suffix_ids
            .get(group)
            .expect("routine name requested for an unregistered group");
        format!("{}{}", group.schema_base_name, suffix)
    }

    /// All registered sites in ascending base-id order.
    pub fn sites(&self) -> impl Iterator<Item = (u64, &MutationGroup)> {
        self.sites.iter().map(|(id, g)| (*id, g))
    }

    /// One representative group per generated routine, ascending suffix order.
    pub fn routines(&self) -> Vec<(String, &MutationGroup)> {
        let mut out: Vec<(u32, &MutationGroup)> =
            self.suffix_ids.iter().map(|(g, s)| (*s, g)).collect();
        out.sort_by_key(|(s, _)| *s);
        out.into_iter()
            .map(|(s, g)| (format!("{}{}", g.schema_base_name, s), g))
            .collect()
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn mutant_count(&self) -> u64 {
        self.next_mutant_id - 1
    }

    /// Finalize into the immutable, serializable snapshot. The build-time
    /// registry is consumed; it never outlives one file's rewrite.
    pub fn into_mutation_registry(self) -> FileLevelMutationRegistry {
        let mut mutations = BTreeMap::new();

        for (base_id, group) in &self.sites {
            for (index, mutant) in group.mutants.iter().enumerate() {
                let mutant_id = base_id + index as u64;
                mutations.insert(
                    mutant_id,
                    Mutation {
                        mutant_id,
                        original_operation: group.original.operation.record_name(),
                        original_expression_template: group.original.template.clone(),
                        mutant_operation: mutant.operation.record_name(),
                        mutant_operand_kind: group.operand_kind,
                        mutant_expression_template: mutant.template.clone(),
                        source_span: group.location.span,
                        line_span: group.location.line_span,
                    },
                );
            }
        }

        FileLevelMutationRegistry {
            file_relative_path: self.file_relative_path,
            activation_signal_name: self.activation_signal_name,
            mutations,
        }
    }
}

/// One globally addressable mutant, flattened for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Mutation {
    pub mutant_id: u64,
    pub original_operation: String,
    pub original_expression_template: String,
    pub mutant_operation: String,
    pub mutant_operand_kind: crate::expr::OperandKind,
    pub mutant_expression_template: String,
    pub source_span: SourceSpan,
    pub line_span: LineSpan,
}

/// Immutable, serializable snapshot of one file's registered mutants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct FileLevelMutationRegistry {
    pub file_relative_path: PathBuf,
    pub activation_signal_name: String,
    /// Keyed by mutant id; serialized with string keys.
    pub mutations: BTreeMap<u64, Mutation>,
}

/// All per-file registries of one project; the unit persisted to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ProjectLevelMutationRegistry {
    pub files: BTreeMap<String, FileLevelMutationRegistry>,
}

impl ProjectLevelMutationRegistry {
    pub fn insert(&mut self, registry: FileLevelMutationRegistry) {
        let key = registry.file_relative_path.display().to_string();
        self.files.insert(key, registry);
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project registry {path:?}"))?;
        let registry = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse project registry {path:?}"))?;
        Ok(registry)
    }

    pub fn total_mutants(&self) -> usize {
        self.files.values().map(|f| f.mutations.len()).sum()
    }
}

/// The only globally unique handle to one mutant: ids alone are unique only
/// within a file.
///
/// Rendered as `"<activationSignalName>:<mutantId>"` wherever a string key
/// is needed (trace files, aggregate result maps).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutantActivationInfo {
    pub activation_signal_name: String,
    pub mutant_id: u64,
}

impl fmt::Display for MutantActivationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.activation_signal_name, self.mutant_id)
    }
}

impl FromStr for MutantActivationInfo {
    type Err = anyhow::Error;

    /// Parse `"<signal>:<id>"`, splitting once on `:`. Anything else is a
    /// hard parse failure.
    fn from_str(s: &str) -> Result<Self> {
        let Some((signal, id)) = s.split_once(':') else {
            bail!("malformed mutant handle {s:?}: expected \"<signal>:<id>\"");
        };
        if signal.is_empty() {
            bail!("malformed mutant handle {s:?}: empty activation signal name");
        }
        let mutant_id: u64 = id
            .trim()
            .parse()
            .with_context(|| format!("malformed mutant handle {s:?}: bad mutant id {id:?}"))?;
        Ok(Self {
            activation_signal_name: signal.to_string(),
            mutant_id,
        })
    }
}
