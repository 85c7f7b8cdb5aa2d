//! Console and voice sessions over the command router
//!
//! Each utterance is dispatched on its own task and its reply is spoken
//! when ready, so a slow lookup never blocks the next utterance. Replies
//! may therefore arrive out of order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use crate::config::ListenerConfig;
use crate::phrases::{greeting_for_hour, normalize};
use crate::router::{CommandRouter, Dispatch};
use crate::voice::{Heard, Recognizer, Speaker};
use crate::Result;

/// Utterances that end a session
const EXIT_WORDS: &[&str] = &["exit", "quit"];

/// Backoff after a failed voice capture
const VOICE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Whether `utterance` ends the session
#[must_use]
pub fn is_exit(utterance: &str) -> bool {
    EXIT_WORDS.contains(&normalize(utterance).as_str())
}

/// An interactive session delivering replies through a speaker
#[derive(Clone)]
pub struct Session {
    router: CommandRouter,
    speaker: Arc<dyn Speaker>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session speaking through the context's speaker
    #[must_use]
    pub fn new(router: CommandRouter) -> Self {
        let speaker = Arc::clone(&router.context().speaker);
        Self { router, speaker }
    }

    #[must_use]
    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Speak the time-of-day greeting
    pub async fn greet(&self) {
        let ctx = self.router.context();
        let hour = chrono::Local::now().hour();
        self.say(&greeting_for_hour(hour, &ctx.config.user_name)).await;
    }

    /// Dispatch `utterance` in the background and speak its reply
    pub fn submit(&self, utterance: impl Into<String>) -> JoinHandle<Option<Dispatch>> {
        let dispatch = self.router.execute_detached(utterance);
        let speaker = Arc::clone(&self.speaker);
        tokio::spawn(async move {
            match dispatch.await {
                Ok(dispatch) => {
                    if let Err(e) = speaker.speak(&dispatch.reply.text).await {
                        tracing::warn!(error = %e, "failed to deliver reply");
                    }
                    Some(dispatch)
                }
                Err(e) => {
                    tracing::error!(error = %e, "dispatch task failed");
                    None
                }
            }
        })
    }

    /// Read utterances line by line until EOF or an exit word
    ///
    /// # Errors
    ///
    /// Returns error if reading the input fails
    pub async fn run_console<R>(&self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut pending = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if is_exit(&line) {
                tracing::info!("console session ended by user");
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            pending.retain(|handle: &JoinHandle<_>| !handle.is_finished());
            pending.push(self.submit(line));
        }

        // Let replies already in flight reach the user
        for handle in pending {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Listen for utterances until an exit word
    ///
    /// Recognition failures are logged and retried; they never end the
    /// session.
    pub async fn run_voice(
        &self,
        recognizer: &mut dyn Recognizer,
        timing: &ListenerConfig,
        calibration: Duration,
    ) {
        if let Err(e) = recognizer.calibrate(calibration).await {
            tracing::warn!(error = %e, "ambient calibration failed, using default threshold");
        }

        loop {
            match recognizer.listen(timing.capture_timeout, timing.phrase_limit).await {
                Ok(Heard::Speech(text)) => {
                    tracing::debug!(heard = %text, "session utterance");
                    if is_exit(&text) {
                        self.say("Goodbye.").await;
                        return;
                    }
                    self.submit(text);
                }
                Ok(Heard::Silence) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "session capture failed");
                    tokio::time::sleep(VOICE_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.speaker.speak(text).await {
            tracing::warn!(error = %e, "failed to speak");
        }
    }
}
