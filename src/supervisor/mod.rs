//! Main-process supervision
//!
//! Tracks the main assistant process through a pid record in the data
//! directory. Liveness is a best-effort probe: the recorded OS start time
//! guards against a recycled pid, but a record without one only proves
//! that *some* process holds the pid.

mod lock;
mod probe;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub use lock::InstanceLock;
pub use probe::{ProcessProbe, START_TIME_TOLERANCE_SECS, SystemProbe};

/// Persisted identity of the launched main process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub launched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
}

impl ProcessRecord {
    /// Read a record; a file holding a bare integer pid is accepted
    ///
    /// Returns `Ok(None)` if the file is missing or unreadable as a record.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Ok(record) = serde_json::from_str::<Self>(&contents) {
            return Ok(Some(record));
        }

        if let Ok(pid) = contents.trim().parse::<u32>() {
            let launched_at = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
            return Ok(Some(Self {
                pid,
                launched_at,
                start_time: None,
            }));
        }

        tracing::warn!(path = %path.display(), "unrecognized pid record, ignoring");
        Ok(None)
    }

    /// Write the record as JSON, replacing any previous file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }
}

/// Program and arguments of the main assistant process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    program: PathBuf,
    args: Vec<String>,
}

impl LaunchTarget {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Result of [`ProcessSupervisor::ensure_running`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A live process already held the record; nothing was started
    AlreadyRunning { pid: u32 },
    /// A new process was started
    Launched { pid: u32 },
}

impl LaunchOutcome {
    #[must_use]
    pub const fn pid(self) -> u32 {
        match self {
            Self::AlreadyRunning { pid } | Self::Launched { pid } => pid,
        }
    }
}

/// Starts a target without waiting for it
pub trait ProcessSpawner: Send + Sync {
    /// Launch `target` and return its pid as soon as the OS provides one
    ///
    /// # Errors
    ///
    /// Returns error if the OS refuses to start the program
    fn spawn(&self, target: &LaunchTarget) -> Result<u32>;
}

/// Spawns targets detached from the console with null stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSpawner;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

impl ProcessSpawner for DetachedSpawner {
    fn spawn(&self, target: &LaunchTarget) -> Result<u32> {
        let mut command = std::process::Command::new(target.program());
        command
            .args(target.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
        }

        let mut child = command.spawn().map_err(|e| {
            Error::Process(format!("failed to launch {}: {e}", target.program().display()))
        })?;
        let pid = child.id();

        // Reap the child so it never lingers as a zombie
        std::thread::Builder::new()
            .name(format!("reaper-{pid}"))
            .spawn(move || {
                if let Ok(status) = child.wait() {
                    tracing::debug!(pid, %status, "detached process exited");
                }
            })?;

        Ok(pid)
    }
}

/// Launches, re-attaches to, and terminates the main assistant process
pub struct ProcessSupervisor {
    record_path: PathBuf,
    probe: Arc<dyn ProcessProbe>,
    spawner: Arc<dyn ProcessSpawner>,
    launch_lock: Mutex<()>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("record_path", &self.record_path)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Supervisor using the OS process table and detached spawning
    #[must_use]
    pub fn new(record_path: impl Into<PathBuf>) -> Self {
        Self::with_parts(record_path, Arc::new(SystemProbe), Arc::new(DetachedSpawner))
    }

    /// Supervisor with explicit probe and spawner
    #[must_use]
    pub fn with_parts(
        record_path: impl Into<PathBuf>,
        probe: Arc<dyn ProcessProbe>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            record_path: record_path.into(),
            probe,
            spawner,
            launch_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    /// Start `target` unless a live process already holds the record
    ///
    /// Returns as soon as the OS hands back a pid.
    ///
    /// # Errors
    ///
    /// Returns error if the launch fails or the record cannot be written
    pub fn ensure_running(&self, target: &LaunchTarget) -> Result<LaunchOutcome> {
        let _guard = self.launch_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(record) = self.live_record()? {
            tracing::debug!(pid = record.pid, "main assistant process already running");
            return Ok(LaunchOutcome::AlreadyRunning { pid: record.pid });
        }

        let pid = self.spawner.spawn(target)?;
        let record = ProcessRecord {
            pid,
            launched_at: Utc::now(),
            start_time: self.probe.start_time(pid),
        };
        record.write(&self.record_path)?;

        tracing::info!(
            pid,
            program = %target.program().display(),
            "launched main assistant process"
        );
        Ok(LaunchOutcome::Launched { pid })
    }

    /// Terminate the recorded process if it is alive, then clear the record
    ///
    /// Returns the pid that was signalled, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read or removed
    pub fn terminate(&self) -> Result<Option<u32>> {
        let _guard = self.launch_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(record) = self.live_record()? else {
            return Ok(None);
        };

        if !self.probe.terminate(record.pid) {
            tracing::warn!(pid = record.pid, "termination signal was not delivered");
        }
        self.clear_record()?;

        tracing::info!(pid = record.pid, "terminated main assistant process");
        Ok(Some(record.pid))
    }

    /// Current record and whether its process is alive
    ///
    /// # Errors
    ///
    /// Returns error if the record file exists but cannot be read
    pub fn status(&self) -> Result<Option<(ProcessRecord, bool)>> {
        Ok(ProcessRecord::read(&self.record_path)?.map(|record| {
            let alive = self.probe.is_alive(record.pid, record.start_time);
            (record, alive)
        }))
    }

    /// Live record, clearing a stale one
    fn live_record(&self) -> Result<Option<ProcessRecord>> {
        let Some(record) = ProcessRecord::read(&self.record_path)? else {
            return Ok(None);
        };

        if self.probe.is_alive(record.pid, record.start_time) {
            return Ok(Some(record));
        }

        tracing::debug!(pid = record.pid, "clearing stale pid record");
        self.clear_record()?;
        Ok(None)
    }

    fn clear_record(&self) -> Result<()> {
        match std::fs::remove_file(&self.record_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Seam through which the wake listener brings up the main process
pub trait MainProcess: Send + Sync {
    /// Ensure the main assistant process is running
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot be launched
    fn ensure_running(&self) -> Result<LaunchOutcome>;
}

/// A supervisor bound to a fixed launch target
#[derive(Debug)]
pub struct SupervisedProcess {
    supervisor: Arc<ProcessSupervisor>,
    target: LaunchTarget,
}

impl SupervisedProcess {
    #[must_use]
    pub const fn new(supervisor: Arc<ProcessSupervisor>, target: LaunchTarget) -> Self {
        Self { supervisor, target }
    }
}

impl MainProcess for SupervisedProcess {
    fn ensure_running(&self) -> Result<LaunchOutcome> {
        self.supervisor.ensure_running(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct FakeProcesses {
        alive: Mutex<HashSet<u32>>,
        next_pid: AtomicU32,
        launches: AtomicU32,
    }

    impl FakeProcesses {
        fn kill(&self, pid: u32) {
            self.alive.lock().unwrap().remove(&pid);
        }
    }

    impl ProcessProbe for FakeProcesses {
        fn start_time(&self, _pid: u32) -> Option<u64> {
            None
        }

        fn exists(&self, pid: u32) -> bool {
            self.alive.lock().unwrap().contains(&pid)
        }

        fn terminate(&self, pid: u32) -> bool {
            self.alive.lock().unwrap().remove(&pid)
        }
    }

    impl ProcessSpawner for FakeProcesses {
        fn spawn(&self, _target: &LaunchTarget) -> Result<u32> {
            let pid = 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
            self.launches.fetch_add(1, Ordering::SeqCst);
            self.alive.lock().unwrap().insert(pid);
            Ok(pid)
        }
    }

    fn supervisor(dir: &Path) -> (ProcessSupervisor, Arc<FakeProcesses>) {
        let fake = Arc::new(FakeProcesses::default());
        let supervisor = ProcessSupervisor::with_parts(
            dir.join("jarvis_launcher.pid"),
            Arc::clone(&fake) as Arc<dyn ProcessProbe>,
            Arc::clone(&fake) as Arc<dyn ProcessSpawner>,
        );
        (supervisor, fake)
    }

    fn target() -> LaunchTarget {
        LaunchTarget::new("jarvis", vec!["session".to_string()])
    }

    #[test]
    fn second_ensure_running_reattaches() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, fake) = supervisor(dir.path());

        let first = supervisor.ensure_running(&target()).unwrap();
        let second = supervisor.ensure_running(&target()).unwrap();

        assert!(matches!(first, LaunchOutcome::Launched { .. }));
        assert_eq!(second, LaunchOutcome::AlreadyRunning { pid: first.pid() });
        assert_eq!(fake.launches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_record_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, fake) = supervisor(dir.path());

        let first = supervisor.ensure_running(&target()).unwrap();
        fake.kill(first.pid());

        let second = supervisor.ensure_running(&target()).unwrap();
        assert!(matches!(second, LaunchOutcome::Launched { .. }));
        assert_ne!(second.pid(), first.pid());
        assert_eq!(fake.launches.load(Ordering::SeqCst), 2);

        let record = ProcessRecord::read(supervisor.record_path()).unwrap().unwrap();
        assert_eq!(record.pid, second.pid());
    }

    #[test]
    fn terminate_clears_record() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, fake) = supervisor(dir.path());

        let launched = supervisor.ensure_running(&target()).unwrap();
        assert_eq!(supervisor.terminate().unwrap(), Some(launched.pid()));
        assert!(!fake.exists(launched.pid()));
        assert!(supervisor.status().unwrap().is_none());

        assert_eq!(supervisor.terminate().unwrap(), None);
    }

    #[test]
    fn legacy_integer_record_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jarvis_launcher.pid");
        std::fs::write(&path, "4242\n").unwrap();

        let record = ProcessRecord::read(&path).unwrap().unwrap();
        assert_eq!(record.pid, 4242);
        assert!(record.start_time.is_none());
    }

    #[test]
    fn garbage_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jarvis_launcher.pid");
        std::fs::write(&path, "not a pid").unwrap();

        assert!(ProcessRecord::read(&path).unwrap().is_none());
    }

    #[test]
    fn status_reports_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, fake) = supervisor(dir.path());

        let launched = supervisor.ensure_running(&target()).unwrap();
        let (record, alive) = supervisor.status().unwrap().unwrap();
        assert_eq!(record.pid, launched.pid());
        assert!(alive);

        fake.kill(launched.pid());
        let (_, alive) = supervisor.status().unwrap().unwrap();
        assert!(!alive);
    }
}
