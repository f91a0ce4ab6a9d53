use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::codegen::{InstrumentationMode, emit_instrumented_file};
use crate::coverage::{CoverageReport, compute_coverage};
use crate::eval::{Evaluator, Value};
use crate::options::{Options, SOURCE_EXTENSION};
use crate::out::{write_instrumented_source, write_registry_json};
use crate::parse::parse_source_unit;
use crate::registry::{FileLevelSchemaRegistry, ProjectLevelMutationRegistry};
use crate::rewrite::instrument_unit;
use crate::runtime;
use crate::scan::{ProjectOverview, collect_source_files, scan_project};
use crate::trace::{MutantTracer, reconstruct_trace};
use crate::ui::Ui;

const EXIT_UNREACHED: i32 = 2;

/// Top-level CLI arguments for the `schema-mutant` binary.
#[derive(Debug, Parser)]
#[command(
    name = "schema-mutant",
    version,
    about = "Mutant schemata generation for surface-language sources"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Dispatch-routine behavior selected on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Routines substitute the activated mutant's expression.
    Mutation,
    /// Routines record reached sites and run the original expression.
    Trace,
}

impl From<ModeArg> for InstrumentationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Mutation => InstrumentationMode::Mutation,
            ModeArg::Trace => InstrumentationMode::Trace,
        }
    }
}

/// Subcommands supported by `schema-mutant`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report the mutation sites an instrumentation run would register.
    Scan {
        /// Root directory of the sources to scan.
        #[arg(long, default_value = ".")]
        source: PathBuf,

        /// Emit the overview as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Instrument a source tree and write the mutation registry.
    Instrument {
        /// Root directory of the sources to instrument.
        #[arg(long, default_value = ".")]
        source: PathBuf,

        /// Output directory for instrumented sources and registry.json.
        #[arg(long, default_value = "schemata-out")]
        out: PathBuf,

        /// What the generated dispatch routines do at run time.
        #[arg(long, value_enum, default_value_t = ModeArg::Mutation)]
        mode: ModeArg,
    },

    /// Instrument one file in memory and run a function through the
    /// reference interpreter.
    Exec {
        /// Source file to instrument and run.
        #[arg(long)]
        file: PathBuf,

        /// Function to call.
        #[arg(long, default_value = "main")]
        entry: String,

        /// Integer arguments passed to the entry function, in order.
        #[arg(long)]
        arg: Vec<i128>,

        /// Mutant id to activate; absent runs the original program.
        #[arg(long)]
        activate: Option<u64>,

        /// Record reached sites to this trace file.
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Match a trace file against a registry and report mutant reachability.
    Coverage {
        /// Path to a registry.json written by `instrument`.
        #[arg(long)]
        registry: PathBuf,

        /// Path to the trace file written by trace-mode test runs.
        #[arg(long)]
        trace: PathBuf,

        /// Emit the coverage report as JSON to stdout.
        #[arg(long)]
        json: bool,

        /// Exit with code 2 if any mutant is unreached (useful for CI).
        #[arg(long)]
        fail_unreached: bool,
    },
}

fn print_json_and_exit<T: Serialize>(value: &T, exit_code: i32) -> ! {
    let json = serde_json::to_string_pretty(value).expect("serialize report to json");
    println!("{json}");
    std::process::exit(exit_code);
}

/// Print human-oriented output.
/// - normal mode: stdout
/// - `--json` mode: stderr (so stdout stays machine-readable)
fn human_ln(json: bool, msg: impl std::fmt::Display) {
    if json {
        eprintln!("{msg}");
    } else {
        println!("{msg}");
    }
}

/// Parse CLI arguments and dispatch the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scan { source, json } => {
            human_ln(json, "schema-mutant: scan");
            human_ln(json, format!("source root: {source:?}"));

            let overview = scan_project(&source)
                .with_context(|| format!("failed to scan sources under {source:?}"))?;

            if json {
                print_json_and_exit(&overview, 0);
            }

            print_scan_summary(&overview);
            Ok(())
        }

        Command::Instrument { source, out, mode } => {
            let options = Options {
                source_root: source,
                out_dir: out,
                mode: mode.into(),
            };
            let mut ui = Ui::new(false);
            instrument_tree(&options, &mut ui)
        }

        Command::Exec {
            file,
            entry,
            arg,
            activate,
            trace,
        } => {
            let code = fs::read_to_string(&file)
                .with_context(|| format!("failed to read source {file:?}"))?;
            let unit = parse_source_unit(&code)
                .with_context(|| format!("failed to parse source {file:?}"))?;

            let rel = file.file_name().map(PathBuf::from).unwrap_or(file.clone());
            let mut registry = FileLevelSchemaRegistry::new(rel);
            let instrumented = instrument_unit(&unit, &mut registry);

            // The interpreter honors the same environment contract as the
            // generated routines: the file's activation signal selects the
            // mutant, the trace-path variable enables tracing.
            let tracer = trace
                .map(|path| MutantTracer::new(registry.activation_signal_name(), path))
                .or_else(|| MutantTracer::from_env(registry.activation_signal_name()));

            let mut eval = Evaluator::new(&instrumented);
            let activate =
                activate.or_else(|| runtime::active_mutant(registry.activation_signal_name()));
            if let Some(id) = activate {
                eval = eval.with_activation(id);
            }
            if let Some(tracer) = &tracer {
                eval = eval.with_tracer(tracer);
            }

            let args: Vec<Value> = arg.into_iter().map(Value::Int).collect();
            let result = eval
                .call(&entry, args)
                .with_context(|| format!("failed to run {entry:?} in {file:?}"))?;
            println!("{entry} = {result}");
            Ok(())
        }

        Command::Coverage {
            registry,
            trace,
            json,
            fail_unreached,
        } => {
            human_ln(json, "schema-mutant: coverage");

            let registry = ProjectLevelMutationRegistry::load(&registry)?;
            let reached = reconstruct_trace(&trace)?;
            let report = compute_coverage(&registry, &reached)?;

            let wants_ci_fail = fail_unreached && !report.fully_reached();
            let exit_code = if wants_ci_fail { EXIT_UNREACHED } else { 0 };

            if json {
                print_json_and_exit(&report, exit_code);
            }

            print_coverage_summary(&report);

            if wants_ci_fail {
                eprintln!(
                    "coverage failed policy: {} mutant(s) unreached (--fail-unreached)",
                    report.total - report.reached
                );
                std::process::exit(EXIT_UNREACHED);
            }

            Ok(())
        }
    }
}

/// Parse, rewrite and emit every source file under the root; write the
/// project registry last so a registry on disk always describes a complete
/// output tree.
fn instrument_tree(options: &Options, ui: &mut Ui) -> Result<()> {
    ui.title("schema-mutant: instrument");
    ui.line(format!("source root: {:?}", options.source_root));
    ui.line(format!("output dir: {:?}", options.out_dir));

    // Clear stale output from a previous run; failure here is not fatal,
    // write_instrumented_source replaces files anyway.
    if options.out_dir.exists() {
        if let Err(err) = fs::remove_dir_all(&options.out_dir) {
            ui.warn(format!(
                "could not clear previous output {:?}: {err}",
                options.out_dir
            ));
        }
    }

    let rels = collect_source_files(&options.source_root)?;
    if rels.is_empty() {
        bail!(
            "no .{SOURCE_EXTENSION} files found under {:?}",
            options.source_root
        );
    }

    let mut project = ProjectLevelMutationRegistry::default();
    for rel in rels {
        let path = options.source_root.join(&rel);
        let code = fs::read_to_string(&path)
            .with_context(|| format!("failed to read source {path:?}"))?;
        let unit = parse_source_unit(&code)
            .with_context(|| format!("failed to parse source {path:?}"))?;

        let mut registry = FileLevelSchemaRegistry::new(&rel);
        let instrumented = instrument_unit(&unit, &mut registry);
        let text = emit_instrumented_file(&instrumented, &registry, options.mode);
        write_instrumented_source(&options.out_dir, &rel, &text)?;

        if registry.site_count() == 0 {
            ui.warn(format!(
                "no mutation sites in {:?}",
                registry.file_relative_path()
            ));
        }
        ui.file_progress(
            registry.file_relative_path().display(),
            registry.site_count(),
            registry.mutant_count(),
        );
        project.insert(registry.into_mutation_registry());
    }

    let registry_path = write_registry_json(&options.out_dir, &project)?;
    ui.line(format!(
        "registered {} mutants across {} files",
        project.total_mutants(),
        project.files.len()
    ));
    ui.line(format!("registry: {registry_path:?}"));
    Ok(())
}

/// Print a short summary based on the project overview.
fn print_scan_summary(overview: &ProjectOverview) {
    println!("--- project overview ---");
    println!("source root:     {}", overview.root.display());
    println!("source files:    {}", overview.files.len());
    println!("mutation sites:  {}", overview.total_sites);
    println!("mutants:         {}", overview.total_mutants);
    for file in &overview.files {
        println!(
            "  {}: {} sites, {} mutants, {} routines",
            file.path.display(),
            file.sites,
            file.mutants,
            file.routines
        );
        for (operation, count) in &file.sites_by_operation {
            println!("    {operation}: {count}");
        }
    }
}

fn print_coverage_summary(report: &CoverageReport) {
    println!("--- trace coverage ---");
    println!("mutants total:    {}", report.total);
    println!("mutants reached:  {}", report.reached);
    println!("mutants unreached: {}", report.total - report.reached);
    println!("coverage:         {:.2}%", report.percent());
    for file in &report.files {
        println!(
            "  {} ({}): {}/{} reached",
            file.path, file.activation_signal_name, file.reached, file.total
        );
        if !file.unreached.is_empty() {
            let ids: Vec<String> = file.unreached.iter().map(u64::to_string).collect();
            println!("    unreached: {}", ids.join(", "));
        }
    }
}
