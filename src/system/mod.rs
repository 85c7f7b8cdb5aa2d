//! Operating system collaborators
//!
//! Device control is delegated to platform commands. Commands are chosen by
//! OS name so the selection logic can be tested on any host.

mod apps;
mod controls;

use crate::Result;
use crate::supervisor::{DetachedSpawner, LaunchTarget, ProcessSpawner};

pub use apps::{AppCatalog, AppEntry};
pub use controls::{BatteryStatus, Direction, HostControls, SystemControl};

/// Opens URLs and starts programs without waiting for them
pub trait Launcher: Send + Sync {
    /// Open `url` in the default browser
    ///
    /// # Errors
    ///
    /// Returns error if no opener exists or it fails to start
    fn open_url(&self, url: &str) -> Result<()>;

    /// Start `target` detached and return its pid
    ///
    /// # Errors
    ///
    /// Returns error if the program cannot be started
    fn launch(&self, target: &LaunchTarget) -> Result<u32>;
}

/// Launcher backed by the detached process spawner
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    spawner: DetachedSpawner,
    os: &'static str,
}

impl SystemLauncher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spawner: DetachedSpawner,
            os: std::env::consts::OS,
        }
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) -> Result<()> {
        let target = url_opener(self.os, url);
        let pid = self.spawner.spawn(&target)?;
        tracing::debug!(pid, url, "opened url");
        Ok(())
    }

    fn launch(&self, target: &LaunchTarget) -> Result<u32> {
        let pid = self.spawner.spawn(target)?;
        tracing::info!(pid, program = %target.program().display(), "launched program");
        Ok(pid)
    }
}

/// Command that opens `url` with the desktop's default handler
#[must_use]
pub fn url_opener(os: &str, url: &str) -> LaunchTarget {
    match os {
        "windows" => LaunchTarget::new(
            "cmd",
            vec!["/C".into(), "start".into(), String::new(), url.into()],
        ),
        "macos" => LaunchTarget::new("open", vec![url.into()]),
        _ => LaunchTarget::new("xdg-open", vec![url.into()]),
    }
}

/// System power actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
    Sleep,
    Lock,
}

/// Platform command for a power action, `None` on unknown platforms
#[must_use]
pub fn power_command(os: &str, action: PowerAction) -> Option<LaunchTarget> {
    let (program, args): (&str, &[&str]) = match (os, action) {
        ("windows", PowerAction::Shutdown) => ("shutdown", &["/s", "/t", "1"]),
        ("windows", PowerAction::Restart) => ("shutdown", &["/r", "/t", "1"]),
        ("windows", PowerAction::Sleep) => {
            ("rundll32.exe", &["powrprof.dll,SetSuspendState", "0,1,0"])
        }
        ("windows", PowerAction::Lock) => ("rundll32.exe", &["user32.dll,LockWorkStation"]),
        ("linux", PowerAction::Shutdown) => ("systemctl", &["poweroff"]),
        ("linux", PowerAction::Restart) => ("systemctl", &["reboot"]),
        ("linux", PowerAction::Sleep) => ("systemctl", &["suspend"]),
        ("linux", PowerAction::Lock) => ("loginctl", &["lock-session"]),
        ("macos", PowerAction::Shutdown) => {
            ("osascript", &["-e", "tell app \"System Events\" to shut down"])
        }
        ("macos", PowerAction::Restart) => {
            ("osascript", &["-e", "tell app \"System Events\" to restart"])
        }
        ("macos", PowerAction::Sleep) => ("pmset", &["sleepnow"]),
        ("macos", PowerAction::Lock) => ("pmset", &["displaysleepnow"]),
        _ => return None,
    };
    Some(target(program, args))
}

/// Platform command that force-closes Chrome
#[must_use]
pub fn close_browser_command(os: &str) -> Option<LaunchTarget> {
    let (program, args): (&str, &[&str]) = match os {
        "windows" => ("taskkill", &["/im", "chrome.exe", "/f"]),
        "macos" => ("pkill", &["-x", "Google Chrome"]),
        "linux" => ("pkill", &["-f", "chrome"]),
        _ => return None,
    };
    Some(target(program, args))
}

fn target(program: &str, args: &[&str]) -> LaunchTarget {
    LaunchTarget::new(program, args.iter().map(|a| (*a).to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_commands_per_platform() {
        let shutdown = power_command("windows", PowerAction::Shutdown).unwrap();
        assert_eq!(shutdown.program().to_str(), Some("shutdown"));
        assert_eq!(shutdown.args(), ["/s", "/t", "1"]);

        let lock = power_command("linux", PowerAction::Lock).unwrap();
        assert_eq!(lock.program().to_str(), Some("loginctl"));

        assert!(power_command("plan9", PowerAction::Restart).is_none());
    }

    #[test]
    fn url_opener_per_platform() {
        let linux = url_opener("linux", "https://github.com");
        assert_eq!(linux.program().to_str(), Some("xdg-open"));
        assert_eq!(linux.args(), ["https://github.com"]);

        let windows = url_opener("windows", "https://github.com");
        assert_eq!(
            windows.args().last().map(String::as_str),
            Some("https://github.com")
        );
    }

    #[test]
    fn close_browser_unknown_platform() {
        assert!(close_browser_command("linux").is_some());
        assert!(close_browser_command("haiku").is_none());
    }
}
