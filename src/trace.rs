use std::collections::{BTreeSet, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use crate::registry::MutantActivationInfo;
use crate::runtime;

/// Outcome of one bounded-wait acquisition attempt on a [`NamedFileLock`].
///
/// An abandoned lock (the owning process died while holding it) is taken
/// over and reported separately from a clean acquisition; a timeout is an
/// ordinary value here and becomes a hard error at the append site.
#[derive(Debug)]
pub enum LockAcquisition {
    Acquired(LockGuard),
    AcquiredFromAbandoned(LockGuard),
    TimedOut,
}

/// Held lock; releasing is removing the lock file. Best-effort on drop: a
/// leaked lock file is reclaimed by the next acquirer's abandonment check.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Cross-process mutual exclusion via an exclusively-created lock file.
///
/// Separate test processes share no memory, so the trace file append is
/// guarded by this OS-level lock rather than in-process synchronization.
#[derive(Debug, Clone)]
pub struct NamedFileLock {
    path: PathBuf,
    timeout: Duration,
    abandoned_after: Duration,
    poll_interval: Duration,
}

impl NamedFileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: Duration::from_secs(10),
            abandoned_after: Duration::from_secs(30),
            poll_interval: Duration::from_millis(25),
        }
    }

    /// Override the wait bounds (mainly for tests).
    pub fn with_timeouts(mut self, timeout: Duration, abandoned_after: Duration) -> Self {
        self.timeout = timeout;
        self.abandoned_after = abandoned_after;
        self.poll_interval = self.poll_interval.min(timeout.max(Duration::from_millis(1)));
        self
    }

    /// Bounded-wait acquire. Once acquired there is no cancellation path;
    /// the guarded operation always runs to completion.
    pub fn acquire(&self) -> Result<LockAcquisition> {
        let deadline = Instant::now() + self.timeout;
        let mut reclaimed = false;

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    // Owner pid, for post-mortem diagnosis only.
                    let _ = writeln!(file, "{}", std::process::id());
                    let guard = LockGuard {
                        path: self.path.clone(),
                    };
                    return Ok(if reclaimed {
                        LockAcquisition::AcquiredFromAbandoned(guard)
                    } else {
                        LockAcquisition::Acquired(guard)
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.is_abandoned() {
                        // Owner crashed while holding the lock; take over.
                        let _ = fs::remove_file(&self.path);
                        reclaimed = true;
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Ok(LockAcquisition::TimedOut);
                    }
                    std::thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to create lock file {:?}", self.path));
                }
            }
        }
    }

    fn is_abandoned(&self) -> bool {
        let age = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok());
        match age {
            Some(age) => age >= self.abandoned_after,
            // Lock file vanished between the open attempt and the check;
            // the next loop iteration will retry the create.
            None => false,
        }
    }
}

/// Records which mutants a test execution could reach, without altering
/// program behavior.
///
/// Duplicate suppression is process-local and thread-safe; durability across
/// processes comes from appending to the shared trace file under the named
/// lock.
#[derive(Debug)]
pub struct MutantTracer {
    activation_signal_name: String,
    trace_path: PathBuf,
    seen: Mutex<HashSet<u64>>,
    lock: NamedFileLock,
}

impl MutantTracer {
    pub fn new(activation_signal_name: impl Into<String>, trace_path: impl Into<PathBuf>) -> Self {
        let trace_path = trace_path.into();
        let lock = NamedFileLock::new(lock_path_for(&trace_path));
        Self {
            activation_signal_name: activation_signal_name.into(),
            trace_path,
            seen: Mutex::new(HashSet::new()),
            lock,
        }
    }

    /// Build a tracer from the trace-path environment variable, or `None`
    /// when the process is not running in trace mode.
    pub fn from_env(activation_signal_name: impl Into<String>) -> Option<Self> {
        runtime::trace_file_from_env().map(|path| Self::new(activation_signal_name, path))
    }

    /// Override the lock's wait bounds (mainly for tests).
    pub fn with_lock_timeouts(mut self, timeout: Duration, abandoned_after: Duration) -> Self {
        self.lock = self.lock.with_timeouts(timeout, abandoned_after);
        self
    }

    /// Record that the mutants `[base_id, base_id + count)` were reached.
    ///
    /// A lock timeout is fatal for the append: a silently dropped trace
    /// record would corrupt downstream matrix pruning, so the whole test
    /// execution is expected to fail loudly instead.
    pub fn record_reached(&self, base_id: u64, count: u64) -> Result<()> {
        let fresh: Vec<u64> = {
            let mut seen = self.seen.lock().expect("trace dedup set poisoned");
            (base_id..base_id + count)
                .filter(|id| seen.insert(*id))
                .collect()
        };

        if fresh.is_empty() {
            return Ok(());
        }

        let guard = match self.lock.acquire()? {
            LockAcquisition::Acquired(g) | LockAcquisition::AcquiredFromAbandoned(g) => g,
            LockAcquisition::TimedOut => bail!(
                "timed out waiting for trace lock {:?}; refusing to drop trace records",
                self.trace_path
            ),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.trace_path)
            .with_context(|| format!("failed to open trace file {:?}", self.trace_path))?;

        let mut buf = String::new();
        for id in &fresh {
            buf.push_str(&self.activation_signal_name);
            buf.push(':');
            buf.push_str(&id.to_string());
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .with_context(|| format!("failed to append to trace file {:?}", self.trace_path))?;

        drop(guard);
        Ok(())
    }
}

fn lock_path_for(trace_path: &Path) -> PathBuf {
    let mut name = trace_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Rebuild the set of reached mutants from a trace file.
///
/// Every line must be `"<signal>:<id>"`; a malformed line fails the whole
/// reconstruction rather than being skipped.
pub fn reconstruct_trace(path: &Path) -> Result<BTreeSet<MutantActivationInfo>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace file {path:?}"))?;

    let mut reached = BTreeSet::new();
    for (idx, line) in contents.lines().enumerate() {
        let info: MutantActivationInfo = line.parse().with_context(|| {
            format!("trace file {path:?} line {}: {line:?}", idx + 1)
        })?;
        reached.insert(info);
    }
    Ok(reached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(set: &BTreeSet<MutantActivationInfo>) -> Vec<u64> {
        set.iter().map(|i| i.mutant_id).collect()
    }

    #[test]
    fn record_appends_one_line_per_mutant() {
        let dir = tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        let tracer = MutantTracer::new("SIG_A", &trace);

        tracer.record_reached(4, 3).unwrap();

        let contents = fs::read_to_string(&trace).unwrap();
        assert_eq!(contents, "SIG_A:4\nSIG_A:5\nSIG_A:6\n");
    }

    #[test]
    fn duplicate_records_are_suppressed_in_process() {
        let dir = tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        let tracer = MutantTracer::new("SIG_A", &trace);

        tracer.record_reached(1, 2).unwrap();
        tracer.record_reached(1, 2).unwrap();
        tracer.record_reached(2, 2).unwrap(); // overlaps, only id 3 is fresh

        let contents = fs::read_to_string(&trace).unwrap();
        assert_eq!(contents, "SIG_A:1\nSIG_A:2\nSIG_A:3\n");
    }

    #[test]
    fn reconstruction_round_trips_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        let tracer = MutantTracer::new("SIG_A", &trace);
        tracer.record_reached(10, 2).unwrap();

        // A second process appends to the same file.
        let other = MutantTracer::new("SIG_B", &trace);
        other.record_reached(1, 1).unwrap();

        let first = reconstruct_trace(&trace).unwrap();
        let second = reconstruct_trace(&trace).unwrap();
        assert_eq!(first, second);
        // The set orders by signal first, then id.
        assert_eq!(ids(&first), vec![10, 11, 1]);
        assert!(first.iter().all(|i| match i.mutant_id {
            10 | 11 => i.activation_signal_name == "SIG_A",
            _ => i.activation_signal_name == "SIG_B",
        }));
    }

    #[test]
    fn malformed_line_fails_the_whole_reconstruction() {
        let dir = tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        fs::write(&trace, "SIG_A:1\ngarbage-without-separator\nSIG_A:2\n").unwrap();

        let err = reconstruct_trace(&trace).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("line 2"), "unexpected error: {msg}");
    }

    #[test]
    fn abandoned_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("t.trace.lock");
        fs::write(&lock_path, "12345\n").unwrap();

        let lock = NamedFileLock::new(&lock_path)
            .with_timeouts(Duration::from_millis(200), Duration::ZERO);

        match lock.acquire().unwrap() {
            LockAcquisition::AcquiredFromAbandoned(_) => {}
            other => panic!("expected takeover, got {other:?}"),
        }
        // Guard dropped: lock file released.
        assert!(!lock_path.exists());
    }

    #[test]
    fn held_lock_times_out_within_the_bound() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("t.trace.lock");
        fs::write(&lock_path, "12345\n").unwrap();

        let lock = NamedFileLock::new(&lock_path)
            .with_timeouts(Duration::from_millis(50), Duration::from_secs(3600));

        match lock.acquire().unwrap() {
            LockAcquisition::TimedOut => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn lock_timeout_makes_the_append_fail_loudly() {
        let dir = tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        fs::write(dir.path().join("t.trace.lock"), "held\n").unwrap();

        let tracer = MutantTracer::new("SIG_A", &trace)
            .with_lock_timeouts(Duration::from_millis(50), Duration::from_secs(3600));

        let err = tracer.record_reached(1, 1).unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
    }

    #[test]
    fn concurrent_threads_record_each_id_once() {
        let dir = tempdir().unwrap();
        let trace = dir.path().join("t.trace");
        let tracer = std::sync::Arc::new(MutantTracer::new("SIG_A", &trace));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracer = tracer.clone();
                std::thread::spawn(move || {
                    for base in 1..=5u64 {
                        tracer.record_reached(base, 2).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let reached = reconstruct_trace(&trace).unwrap();
        assert_eq!(ids(&reached), vec![1, 2, 3, 4, 5, 6]);

        // Exactly one line per id despite eight racing threads.
        let contents = fs::read_to_string(&trace).unwrap();
        assert_eq!(contents.lines().count(), 6);
    }
}
