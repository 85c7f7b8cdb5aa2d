//! Battery, volume and brightness through platform commands

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Percent changed per volume or brightness step
const STEP_PERCENT: u8 = 10;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Battery charge snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub percent: u8,
    pub charging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Device controls the router can adjust
///
/// Implementations return `Error::NotFound` when the device does not exist
/// and `Error::Unsupported` when the platform has no way to do it.
#[async_trait]
pub trait SystemControl: Send + Sync {
    async fn battery(&self) -> Result<BatteryStatus>;

    async fn change_volume(&self, direction: Direction) -> Result<()>;

    async fn set_muted(&self, muted: bool) -> Result<()>;

    async fn change_brightness(&self, direction: Direction) -> Result<()>;

    async fn set_brightness(&self, percent: u8) -> Result<()>;
}

/// Controls for the machine this process runs on
#[derive(Debug, Clone)]
pub struct HostControls {
    os: &'static str,
    power_supply_dir: PathBuf,
}

impl HostControls {
    #[must_use]
    pub fn new() -> Self {
        Self {
            os: std::env::consts::OS,
            power_supply_dir: PathBuf::from(POWER_SUPPLY_DIR),
        }
    }

    /// Read battery state from a sysfs-style directory instead of the host's
    #[must_use]
    pub fn with_power_supply_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.power_supply_dir = dir.into();
        self
    }

    fn unsupported(&self, what: &str) -> Error {
        Error::Unsupported(format!("{what} on {}", self.os))
    }

    async fn sysfs_battery(&self) -> Result<BatteryStatus> {
        let mut entries = tokio::fs::read_dir(&self.power_supply_dir)
            .await
            .map_err(|_| Error::NotFound("battery".to_string()))?;

        while let Some(entry) = entries.next_entry().await? {
            let dir = entry.path();
            let kind = tokio::fs::read_to_string(dir.join("type")).await.unwrap_or_default();
            if kind.trim() != "Battery" {
                continue;
            }

            let capacity = tokio::fs::read_to_string(dir.join("capacity")).await?;
            let percent = capacity
                .trim()
                .parse::<u8>()
                .map_err(|e| Error::Provider(format!("bad battery capacity: {e}")))?;
            let status = tokio::fs::read_to_string(dir.join("status")).await.unwrap_or_default();
            let charging = matches!(status.trim(), "Charging" | "Full");
            return Ok(BatteryStatus { percent, charging });
        }

        Err(Error::NotFound("battery".to_string()))
    }
}

impl Default for HostControls {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemControl for HostControls {
    async fn battery(&self) -> Result<BatteryStatus> {
        match self.os {
            "macos" => {
                let output = run("pmset", &["-g", "batt"]).await?;
                parse_pmset(&output).ok_or_else(|| Error::NotFound("battery".to_string()))
            }
            "windows" => Err(self.unsupported("battery status")),
            _ => self.sysfs_battery().await,
        }
    }

    async fn change_volume(&self, direction: Direction) -> Result<()> {
        let sign = match direction {
            Direction::Up => '+',
            Direction::Down => '-',
        };
        match self.os {
            "linux" => {
                let step = format!("{sign}{STEP_PERCENT}%");
                run("pactl", &["set-sink-volume", "@DEFAULT_SINK@", &step]).await?;
            }
            "macos" => {
                let script = format!(
                    "set volume output volume ((output volume of (get volume settings)) {sign} {STEP_PERCENT})"
                );
                run("osascript", &["-e", &script]).await?;
            }
            _ => return Err(self.unsupported("volume control")),
        }
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        match self.os {
            "linux" => {
                let flag = if muted { "1" } else { "0" };
                run("pactl", &["set-sink-mute", "@DEFAULT_SINK@", flag]).await?;
            }
            "macos" => {
                let script = if muted {
                    "set volume with output muted"
                } else {
                    "set volume without output muted"
                };
                run("osascript", &["-e", script]).await?;
            }
            _ => return Err(self.unsupported("mute")),
        }
        Ok(())
    }

    async fn change_brightness(&self, direction: Direction) -> Result<()> {
        match self.os {
            "linux" => {
                let step = match direction {
                    Direction::Up => format!("+{STEP_PERCENT}%"),
                    Direction::Down => format!("{STEP_PERCENT}%-"),
                };
                run("brightnessctl", &["set", &step]).await?;
                Ok(())
            }
            _ => Err(self.unsupported("brightness control")),
        }
    }

    async fn set_brightness(&self, percent: u8) -> Result<()> {
        let percent = percent.min(100);
        match self.os {
            "linux" => {
                run("brightnessctl", &["set", &format!("{percent}%")]).await?;
            }
            "windows" => {
                let script = format!(
                    "(Get-WmiObject -Namespace root/WMI -Class WmiMonitorBrightnessMethods).WmiSetBrightness(1,{percent})"
                );
                run("powershell", &["-NoProfile", "-Command", &script]).await?;
            }
            _ => return Err(self.unsupported("brightness control")),
        }
        Ok(())
    }
}

/// Run a control command and return its stdout
async fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::Unsupported(format!("{program} is not installed"))
            }
            _ => Error::Process(format!("failed to run {program}: {e}")),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(program, stderr = %stderr.trim(), "control command failed");
        return Err(Error::Process(format!(
            "{program} exited with {:?}",
            output.status.code()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `pmset -g batt` output
fn parse_pmset(output: &str) -> Option<BatteryStatus> {
    let line = output.lines().find(|l| l.contains('%'))?;
    let percent_end = line.find('%')?;
    let digits_start = line[..percent_end]
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let percent = line[digits_start..percent_end].parse().ok()?;
    let charging = output.contains("AC Power") || line.contains("; charging");
    Some(BatteryStatus { percent, charging })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_supply(root: &std::path::Path, name: &str, kind: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("type"), kind).unwrap();
        for (file, content) in files {
            std::fs::write(dir.join(file), content).unwrap();
        }
    }

    #[tokio::test]
    async fn reads_sysfs_battery() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", "Mains\n", &[("online", "1\n")]);
        write_supply(
            dir.path(),
            "BAT0",
            "Battery\n",
            &[("capacity", "87\n"), ("status", "Charging\n")],
        );

        let controls = HostControls::new().with_power_supply_dir(dir.path());
        let status = controls.sysfs_battery().await.unwrap();
        assert_eq!(
            status,
            BatteryStatus {
                percent: 87,
                charging: true,
            }
        );
    }

    #[tokio::test]
    async fn missing_battery_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", "Mains\n", &[]);

        let controls = HostControls::new().with_power_supply_dir(dir.path());
        assert!(matches!(controls.sysfs_battery().await, Err(Error::NotFound(_))));

        let controls = HostControls::new().with_power_supply_dir(dir.path().join("missing"));
        assert!(matches!(controls.sysfs_battery().await, Err(Error::NotFound(_))));
    }

    #[test]
    fn parses_pmset_output() {
        let output = concat!(
            "Now drawing from 'Battery Power'\n",
            " -InternalBattery-0 (id=1234)\t64%; discharging; 3:12 remaining present: true\n",
        );
        assert_eq!(
            parse_pmset(output),
            Some(BatteryStatus {
                percent: 64,
                charging: false,
            })
        );

        let plugged = concat!(
            "Now drawing from 'AC Power'\n",
            " -InternalBattery-0 (id=1234)\t100%; charged; 0:00 remaining\n",
        );
        assert_eq!(
            parse_pmset(plugged),
            Some(BatteryStatus {
                percent: 100,
                charging: true,
            })
        );
    }
}
