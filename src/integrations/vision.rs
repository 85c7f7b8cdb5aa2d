//! Camera features delegated to an external helper program
//!
//! The helper is invoked as `<command...> faces` or `<command...> qr` and
//! prints a one-line summary on stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::CameraVision;
use crate::{Error, Result};

/// Helper runtime limit; camera scans wait for the user
const HELPER_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the configured vision helper
#[derive(Debug, Clone)]
pub struct ExternalVision {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalVision {
    /// Build from a command line split into words
    ///
    /// Returns `None` for an empty command.
    #[must_use]
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: HELPER_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, mode: &str) -> Result<String> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(mode)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process(format!("failed to start vision helper: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Process(format!("vision helper timed out running {mode}")))??;

        if !output.stderr.is_empty() {
            tracing::debug!(
                mode,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "vision helper stderr"
            );
        }

        if !output.status.success() {
            return Err(Error::Process(format!(
                "vision helper exited with {:?}",
                output.status.code()
            )));
        }

        let summary = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if summary.is_empty() {
            return Err(Error::Process("vision helper printed nothing".to_string()));
        }
        Ok(summary)
    }
}

#[async_trait]
impl CameraVision for ExternalVision {
    async fn detect_faces(&self) -> Result<String> {
        self.run("faces").await
    }

    async fn detect_qr(&self) -> Result<String> {
        self.run("qr").await
    }
}
