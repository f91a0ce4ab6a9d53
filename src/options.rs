use std::path::PathBuf;

use crate::codegen::InstrumentationMode;

/// File extension of surface-language sources.
pub const SOURCE_EXTENSION: &str = "src";

/// Configuration options for schema-mutant derived from the CLI
#[derive(Debug, Clone)]
pub struct Options {
    /// Root directory of the sources to instrument.
    pub source_root: PathBuf,

    /// Directory the instrumented sources and registry are written to.
    pub out_dir: PathBuf,

    /// What the generated dispatch routines do at run time.
    pub mode: InstrumentationMode,
}
