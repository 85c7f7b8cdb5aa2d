//! Process liveness probing

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, Signal, System};

/// Seconds of tolerance when comparing recorded and observed start times
pub const START_TIME_TOLERANCE_SECS: u64 = 2;

/// Non-destructive view of the OS process table
pub trait ProcessProbe: Send + Sync {
    /// OS start time of `pid` in seconds since the epoch, if it exists
    fn start_time(&self, pid: u32) -> Option<u64>;

    /// Whether `pid` refers to a running, non-zombie process
    fn exists(&self, pid: u32) -> bool;

    /// Ask `pid` to terminate; returns whether a signal was delivered
    fn terminate(&self, pid: u32) -> bool;

    /// Whether `pid` is alive and, when `expected_start` is known, is the
    /// same process that was recorded
    fn is_alive(&self, pid: u32, expected_start: Option<u64>) -> bool {
        if !self.exists(pid) {
            return false;
        }

        let Some(expected) = expected_start else {
            return true;
        };

        match self.start_time(pid) {
            Some(actual) => actual.abs_diff(expected) <= START_TIME_TOLERANCE_SECS,
            None => true,
        }
    }
}

/// Probe backed by `sysinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    fn with_process<T>(pid: u32, f: impl FnOnce(&sysinfo::Process) -> T) -> Option<T> {
        let mut sys = System::new();
        let sys_pid = Pid::from_u32(pid);
        sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
        sys.process(sys_pid).map(f)
    }
}

impl ProcessProbe for SystemProbe {
    fn start_time(&self, pid: u32) -> Option<u64> {
        Self::with_process(pid, sysinfo::Process::start_time)
    }

    fn exists(&self, pid: u32) -> bool {
        Self::with_process(pid, |p| {
            !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
        })
        .unwrap_or(false)
    }

    fn terminate(&self, pid: u32) -> bool {
        Self::with_process(pid, |p| p.kill_with(Signal::Term).unwrap_or_else(|| p.kill()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        let probe = SystemProbe;
        let pid = std::process::id();
        let started = probe.start_time(pid);

        assert!(probe.exists(pid));
        assert!(started.is_some());
        assert!(probe.is_alive(pid, started));
    }

    #[test]
    fn recycled_pid_is_rejected() {
        let probe = SystemProbe;
        let pid = std::process::id();
        let started = probe.start_time(pid).unwrap();

        assert!(!probe.is_alive(pid, Some(started.saturating_sub(3600))));
    }

    #[test]
    fn unknown_pid_is_dead() {
        assert!(!SystemProbe.is_alive(u32::MAX - 1, None));
    }
}
