use console::{Term, style};
use std::{env, fmt::Display};

/// Small UI helper:
/// - normal mode: human output to stdout, errors to stderr
/// - `--json` mode: ALL human output to stderr (stdout stays machine-readable JSON)
/// - fancy styling only on a real TTY and when NO_COLOR/CI are not set
#[derive(Debug, Clone)]
pub struct Ui {
    out: Term,
    err: Term,
    fancy: bool,
    enabled: bool,

    // Observability hooks (used by unit tests). These do not affect output
    // formatting.
    files_instrumented: u64,
    sites_registered: u64,
    mutants_registered: u64,
    warnings: u64,
}

impl Ui {
    pub fn new(json: bool) -> Self {
        // In --json mode, keep stdout clean for JSON and send all human output to stderr.
        let out = if json { Term::stderr() } else { Term::stdout() };
        let err = Term::stderr();

        // Fancy output must only activate when the actual stream used for human output is a TTY.
        let out_is_tty = out.is_term();

        let no_color = env::var_os("NO_COLOR").is_some();
        let in_ci = env::var_os("CI").is_some();

        let fancy = out_is_tty && !no_color && !in_ci;

        Self {
            out,
            err,
            fancy,
            enabled: true,
            files_instrumented: 0,
            sites_registered: 0,
            mutants_registered: 0,
            warnings: 0,
        }
    }

    /// Useful for unit tests to avoid noisy output.
    /// Kept behind cfg(test) so it doesn't trigger dead_code in `cargo run`.
    #[cfg(test)]
    pub fn silent() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            fancy: false,
            enabled: false,
            files_instrumented: 0,
            sites_registered: 0,
            mutants_registered: 0,
            warnings: 0,
        }
    }

    fn write_out(&self, s: &str) {
        if self.enabled {
            let _ = self.out.write_line(s);
        }
    }

    fn write_err(&self, s: &str) {
        if self.enabled {
            let _ = self.err.write_line(s);
        }
    }

    pub fn line(&self, msg: impl Display) {
        self.write_out(&msg.to_string());
    }

    pub fn title(&self, msg: impl Display) {
        let s = msg.to_string();
        if self.fancy {
            self.write_out(&style(s).bold().to_string());
        } else {
            self.write_out(&s);
        }
    }

    pub fn warn(&mut self, msg: impl Display) {
        self.warnings += 1;
        let s = msg.to_string();
        if self.fancy {
            self.write_err(&style(s).yellow().to_string());
        } else {
            self.write_err(&s);
        }
    }

    /// Per-file progress line during instrumentation.
    pub fn file_progress(&mut self, path: impl Display, sites: usize, mutants: u64) {
        self.files_instrumented += 1;
        self.sites_registered += sites as u64;
        self.mutants_registered += mutants;

        if !self.fancy {
            self.line(format!(
                "instrumented {path}: {sites} sites, {mutants} mutants"
            ));
            return;
        }

        self.line(format!(
            "{} {path}: {} sites, {} mutants",
            style("OK").green().bold(),
            style(sites).bold(),
            style(mutants).bold(),
        ));
    }

    #[allow(dead_code)]
    pub fn is_fancy(&self) -> bool {
        self.fancy && self.enabled
    }
}
