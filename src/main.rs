mod ast;
mod cli;
mod codegen;
mod coverage;
mod eval;
mod expr;
mod group;
mod operators;
mod options;
mod out;
mod parse;
mod registry;
mod rewrite;
mod runtime;
mod scan;
mod span;
mod trace;
mod ui;

/// Entry point for the `schema-mutant` binary.
fn main() -> anyhow::Result<()> {
    cli::run()
}
