//! Fire-and-forget side effects
//!
//! Effects are submitted after a reply is built and run on their own tokio
//! task. Nothing waits on them; failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::reminders::ReminderScheduler;
use crate::router::SideEffect;
use crate::system::Launcher;
use crate::voice::Speaker;

struct Inner {
    launcher: Arc<dyn Launcher>,
    speaker: Arc<dyn Speaker>,
    reminders: ReminderScheduler,
}

/// Runs side effects against the launcher, speaker and reminder timers
#[derive(Clone)]
pub struct EffectRunner {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EffectRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRunner")
            .field("pending_reminders", &self.inner.reminders.pending().len())
            .finish_non_exhaustive()
    }
}

impl EffectRunner {
    #[must_use]
    pub fn new(launcher: Arc<dyn Launcher>, speaker: Arc<dyn Speaker>) -> Self {
        Self {
            inner: Arc::new(Inner {
                launcher,
                speaker,
                reminders: ReminderScheduler::new(),
            }),
        }
    }

    #[must_use]
    pub fn reminders(&self) -> &ReminderScheduler {
        &self.inner.reminders
    }

    /// Start `effect` in the background
    pub fn submit(&self, effect: SideEffect) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(effect).await })
    }

    /// Perform `effect` on the current task
    pub async fn run(&self, effect: SideEffect) {
        match effect {
            SideEffect::OpenUrl(url) => {
                if let Err(e) = self.inner.launcher.open_url(&url) {
                    tracing::warn!(error = %e, url, "failed to open url");
                }
            }
            SideEffect::RunProcess(target) => {
                if let Err(e) = self.inner.launcher.launch(&target) {
                    tracing::warn!(
                        error = %e,
                        program = %target.program().display(),
                        "failed to run process"
                    );
                }
            }
            SideEffect::PlayAudio(text) => {
                if let Err(e) = self.inner.speaker.speak(&text).await {
                    tracing::warn!(error = %e, "failed to play audio");
                }
            }
            SideEffect::ScheduleTimer { task, minutes } => {
                let delay = Duration::from_secs(minutes.saturating_mul(60));
                self.inner.reminders.schedule(&task, delay, self.clone());
            }
        }
    }
}
