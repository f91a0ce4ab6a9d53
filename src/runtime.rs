use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variable carrying the trace-output file path for trace-mode
/// runs. Read once and cached for the life of the process.
pub const TRACE_PATH_ENV: &str = "SCHEMA_MUTANT_TRACE";

static TRACE_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// The single activated mutant id for `signal`, if any.
///
/// An absent or empty activation signal means the program runs unmutated.
pub fn active_mutant(signal: &str) -> Option<u64> {
    let raw = env::var(signal).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

/// Dispatch selection: `Some(k)` picks mutant `k` of the site at `base_id`,
/// `None` runs the original expression.
pub fn select(active: Option<u64>, base_id: u64, count: u64) -> Option<usize> {
    let id = active?;
    if id >= base_id && id < base_id + count {
        Some((id - base_id) as usize)
    } else {
        None
    }
}

/// Trace-output path from the environment, read once per process.
pub fn trace_file_from_env() -> Option<PathBuf> {
    TRACE_PATH
        .get_or_init(|| {
            env::var_os(TRACE_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_picks_inside_the_site_range() {
        assert_eq!(select(None, 5, 3), None);
        assert_eq!(select(Some(4), 5, 3), None);
        assert_eq!(select(Some(5), 5, 3), Some(0));
        assert_eq!(select(Some(6), 5, 3), Some(1));
        assert_eq!(select(Some(7), 5, 3), Some(2));
        assert_eq!(select(Some(8), 5, 3), None);
    }

    #[test]
    fn empty_signal_runs_unmutated() {
        // Use a name no other test touches; env access is process-global.
        unsafe { env::set_var("SCHEMA_MUTANT_TEST_EMPTY", "") };
        assert_eq!(active_mutant("SCHEMA_MUTANT_TEST_EMPTY"), None);
        assert_eq!(active_mutant("SCHEMA_MUTANT_TEST_UNSET"), None);

        unsafe { env::set_var("SCHEMA_MUTANT_TEST_SET", "12") };
        assert_eq!(active_mutant("SCHEMA_MUTANT_TEST_SET"), Some(12));
    }
}
