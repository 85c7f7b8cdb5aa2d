//! Single-instance lock for the wake listener

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{ProcessProbe, ProcessRecord};
use crate::{Error, Result};

/// Pid file held for the lifetime of one wake listener
///
/// Removed on drop. A file left behind by a dead process is replaced.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Acquire the lock at `path` for the current process
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` if a live process holds the lock, or
    /// an IO error if the file cannot be created
    pub fn acquire(path: impl Into<PathBuf>, probe: &dyn ProcessProbe) -> Result<Self> {
        let path = path.into();
        let pid = std::process::id();
        let record = ProcessRecord {
            pid,
            launched_at: Utc::now(),
            start_time: probe.start_time(pid),
        };

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&serde_json::to_vec(&record)?)?;
                    tracing::debug!(path = %path.display(), pid, "instance lock acquired");
                    return Ok(Self { path, pid });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    Self::clear_if_stale(&path, pid, probe)?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Process(format!(
            "could not acquire instance lock {}",
            path.display()
        )))
    }

    fn clear_if_stale(path: &Path, own_pid: u32, probe: &dyn ProcessProbe) -> Result<()> {
        if let Some(holder) = ProcessRecord::read(path)? {
            if holder.pid != own_pid && probe.is_alive(holder.pid, holder.start_time) {
                return Err(Error::AlreadyRunning { pid: holder.pid });
            }
            tracing::debug!(pid = holder.pid, "replacing stale instance lock");
        }

        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let still_ours = ProcessRecord::read(&self.path)
            .ok()
            .flatten()
            .is_some_and(|r| r.pid == self.pid);

        if still_ours {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to release instance lock"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        alive: bool,
    }

    impl ProcessProbe for Probe {
        fn start_time(&self, _pid: u32) -> Option<u64> {
            None
        }

        fn exists(&self, _pid: u32) -> bool {
            self.alive
        }

        fn terminate(&self, _pid: u32) -> bool {
            false
        }
    }

    fn foreign_holder(path: &Path) {
        let record = ProcessRecord {
            pid: std::process::id().wrapping_add(1),
            launched_at: Utc::now(),
            start_time: None,
        };
        record.write(path).unwrap();
    }

    #[test]
    fn acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wake_listener.lock");

        let lock = InstanceLock::acquire(&path, &Probe { alive: true }).unwrap();
        assert!(path.exists());
        assert_eq!(lock.pid(), std::process::id());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn live_holder_refuses_second_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wake_listener.lock");
        foreign_holder(&path);

        let err = InstanceLock::acquire(&path, &Probe { alive: true }).unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning { .. }));
        assert!(path.exists());
    }

    #[test]
    fn stale_holder_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wake_listener.lock");
        foreign_holder(&path);

        let lock = InstanceLock::acquire(&path, &Probe { alive: false }).unwrap();
        let record = ProcessRecord::read(lock.path()).unwrap().unwrap();
        assert_eq!(record.pid, std::process::id());
    }
}
