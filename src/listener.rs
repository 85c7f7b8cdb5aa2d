//! Background wake-word listener
//!
//! One long-lived task captures, transcribes, and reacts to sleep and wake
//! phrases. Everything else it hears is dropped; commands belong to the
//! session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Timelike;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Error;
use crate::config::ListenerConfig;
use crate::context::AssistantContext;
use crate::error::RecognitionFailure;
use crate::phrases::{PhraseBook, greeting_for_hour, normalize};
use crate::state::PersistentStateStore;
use crate::supervisor::{LaunchOutcome, MainProcess};
use crate::voice::{Heard, Recognizer, Speaker};

/// Spoken when entering sleep
const SLEEP_ACK: &str = "Going to sleep.";

/// Prefix of the greeting when waking from sleep
const RESUME_ACK: &str = "I'm back.";

/// Counters describing the listener's progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Capture attempts that returned (speech, silence, or failure)
    pub captures: u64,
    /// Recognition failures followed by a backoff
    pub failures: u64,
    /// Transitions to asleep
    pub sleeps: u64,
    /// Wake phrases acted on
    pub wakes: u64,
    /// Main processes started on wake
    pub launches: u64,
}

#[derive(Debug, Default)]
struct Counters {
    captures: AtomicU64,
    failures: AtomicU64,
    sleeps: AtomicU64,
    wakes: AtomicU64,
    launches: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            captures: self.captures.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            sleeps: self.sleeps.load(Ordering::Relaxed),
            wakes: self.wakes.load(Ordering::Relaxed),
            launches: self.launches.load(Ordering::Relaxed),
        }
    }
}

fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

/// The wake-word loop and its collaborators
pub struct WakeListener {
    recognizer: Box<dyn Recognizer>,
    store: Arc<PersistentStateStore>,
    main: Arc<dyn MainProcess>,
    speaker: Arc<dyn Speaker>,
    phrases: PhraseBook,
    user_name: String,
    timing: ListenerConfig,
    calibration: Duration,
    clock: fn() -> u32,
    counters: Arc<Counters>,
}

impl WakeListener {
    #[must_use]
    pub fn new(
        recognizer: Box<dyn Recognizer>,
        store: Arc<PersistentStateStore>,
        main: Arc<dyn MainProcess>,
        speaker: Arc<dyn Speaker>,
        phrases: PhraseBook,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            recognizer,
            store,
            main,
            speaker,
            phrases,
            user_name: user_name.into(),
            timing: ListenerConfig::default(),
            calibration: Duration::from_millis(1000),
            clock: local_hour,
            counters: Arc::default(),
        }
    }

    /// Listener wired from the shared context
    #[must_use]
    pub fn from_context(
        ctx: &AssistantContext,
        recognizer: Box<dyn Recognizer>,
        main: Arc<dyn MainProcess>,
    ) -> Self {
        let phrases = PhraseBook::for_listener(&ctx.config.assistant_name)
            .with_overrides(&ctx.config.phrases);

        Self::new(
            recognizer,
            Arc::clone(&ctx.store),
            main,
            Arc::clone(&ctx.speaker),
            phrases,
            ctx.config.user_name.clone(),
        )
        .with_timing(ctx.config.listener.clone())
        .with_calibration(ctx.config.voice.calibration)
    }

    #[must_use]
    pub fn with_timing(mut self, timing: ListenerConfig) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub const fn with_calibration(mut self, calibration: Duration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Override the local-hour source used for greetings
    #[must_use]
    pub const fn with_clock(mut self, clock: fn() -> u32) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn the loop; it runs until [`ListenerHandle::stop`]
    #[must_use]
    pub fn start(self) -> ListenerHandle {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let counters = Arc::clone(&self.counters);
        let task = tokio::spawn(self.run(stop_rx));

        ListenerHandle {
            stop_tx,
            task,
            counters,
        }
    }

    async fn run(mut self, mut stop_rx: mpsc::Receiver<()>) {
        tracing::info!(
            asleep = self.store.is_sleeping(),
            wake_phrases = ?self.phrases.wake.as_slice(),
            "wake listener started"
        );

        tokio::select! {
            biased;
            _ = stop_rx.recv() => {
                tracing::info!("wake listener stopped during calibration");
                return;
            }
            calibrated = self.recognizer.calibrate(self.calibration) => {
                if let Err(e) = calibrated {
                    tracing::warn!(
                        error = %e,
                        "ambient calibration failed, using default threshold"
                    );
                }
            }
        }

        loop {
            let heard = tokio::select! {
                biased;
                _ = stop_rx.recv() => break,
                heard = self
                    .recognizer
                    .listen(self.timing.capture_timeout, self.timing.phrase_limit) => heard,
            };
            Counters::bump(&self.counters.captures);

            let backoff = match heard {
                Ok(Heard::Speech(text)) => {
                    self.handle_utterance(&text);
                    None
                }
                Ok(Heard::Silence) => None,
                Err(e) => {
                    Counters::bump(&self.counters.failures);
                    let delay = self.backoff_for(&e);
                    let delay_ms = delay.as_millis();
                    if e.is_transient() {
                        tracing::debug!(error = %e, delay_ms, "capture failed, backing off");
                    } else {
                        tracing::warn!(error = %e, delay_ms, "capture failed, backing off");
                    }
                    Some(delay)
                }
            };

            if let Some(delay) = backoff {
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::info!(stats = ?self.counters.snapshot(), "wake listener stopped");
    }

    fn backoff_for(&self, error: &Error) -> Duration {
        match error {
            Error::Recognition(RecognitionFailure::NoSpeech) => self.timing.no_speech_backoff,
            Error::Recognition(RecognitionFailure::ServiceUnavailable)
            | Error::Stt(_)
            | Error::Http(_) => self.timing.service_backoff,
            _ => self.timing.error_backoff,
        }
    }

    fn handle_utterance(&self, text: &str) {
        let text = normalize(text);
        tracing::debug!(heard = %text, "utterance captured");

        if self.phrases.sleep.matches(&text) {
            self.enter_sleep();
        } else if self.phrases.wake.matches(&text) {
            self.wake();
        } else {
            tracing::trace!("utterance ignored by wake listener");
        }
    }

    fn enter_sleep(&self) {
        match self.store.set_sleep_mode(true) {
            Ok(true) => {
                tracing::info!("already sleeping");
                return;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "failed to persist sleep state"),
        }

        Counters::bump(&self.counters.sleeps);
        tracing::info!("assistant set to sleep");
        self.say(SLEEP_ACK.to_string());
    }

    fn wake(&self) {
        let was_sleeping = self.store.set_sleep_mode(false).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to persist awake state");
            false
        });
        Counters::bump(&self.counters.wakes);

        let greeting = greeting_for_hour((self.clock)(), &self.user_name);
        self.say(if was_sleeping {
            format!("{RESUME_ACK} {greeting}")
        } else {
            greeting
        });

        match self.main.ensure_running() {
            Ok(LaunchOutcome::Launched { pid }) => {
                Counters::bump(&self.counters.launches);
                tracing::info!(pid, "main assistant launched on wake");
            }
            Ok(LaunchOutcome::AlreadyRunning { pid }) => {
                tracing::debug!(pid, "main assistant already running");
            }
            Err(e) => tracing::warn!(error = %e, "failed to launch main assistant"),
        }
    }

    /// Speak without blocking recognition
    fn say(&self, text: String) {
        let speaker = Arc::clone(&self.speaker);
        tokio::spawn(async move {
            if let Err(e) = speaker.speak(&text).await {
                tracing::warn!(error = %e, "failed to speak listener reply");
            }
        });
    }
}

/// Owner of a running [`WakeListener`]
///
/// Dropping the handle also stops the loop at its next await point.
#[derive(Debug)]
pub struct ListenerHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl ListenerHandle {
    /// Signal the loop to stop and wait for it to finish
    pub async fn stop(self) {
        let _ = self.stop_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "wake listener task failed");
        }
    }

    #[must_use]
    pub fn stats(&self) -> ListenerStats {
        self.counters.snapshot()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
