//! Wake listener integration tests
//!
//! Runs the loop against scripted recognizers on paused time

use std::sync::Arc;
use std::sync::atomic::Ordering;

use jarvis::voice::Heard;
use jarvis::{Error, PersistentStateStore, PhraseBook, RecognitionFailure, WakeListener};

mod common;

use common::{CountingMain, RecordingSpeaker, ScriptedRecognizer, eventually};

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<PersistentStateStore>,
    speaker: Arc<RecordingSpeaker>,
    main: Arc<CountingMain>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PersistentStateStore::new(
            dir.path().join("jarvis_state.json"),
            dir.path().join("memory.json"),
        ));
        Self {
            _dir: dir,
            store,
            speaker: Arc::default(),
            main: Arc::default(),
        }
    }

    fn listener(&self, recognizer: ScriptedRecognizer) -> WakeListener {
        WakeListener::new(
            Box::new(recognizer),
            Arc::clone(&self.store),
            self.main.clone(),
            self.speaker.clone(),
            PhraseBook::for_listener("jarvis"),
            "User",
        )
        .with_clock(|| 9)
    }

    fn reloaded_store(&self) -> PersistentStateStore {
        PersistentStateStore::new(self.store.state_path(), self.store.memory_path())
    }
}

#[tokio::test(start_paused = true)]
async fn test_failures_do_not_stop_the_loop() {
    let harness = Harness::new();
    let (recognizer, listens) = ScriptedRecognizer::new(vec![
        Err(Error::Recognition(RecognitionFailure::NoSpeech)),
        Err(Error::Recognition(RecognitionFailure::ServiceUnavailable)),
        Err(Error::Recognition(RecognitionFailure::Microphone)),
        Ok(Heard::Speech("nothing to see here".to_string())),
    ]);

    let handle = harness.listener(recognizer).start();
    eventually(|| listens.load(Ordering::SeqCst) >= 4).await;

    let stats = handle.stats();
    assert_eq!(stats.failures, 3);
    assert!(stats.captures >= 4);
    assert!(!handle.is_finished());

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_sleep_phrase_persists_across_reload() {
    let harness = Harness::new();
    let (recognizer, _) =
        ScriptedRecognizer::new(vec![Ok(Heard::Speech("Go to sleep Jarvis".to_string()))]);

    let handle = harness.listener(recognizer).start();
    eventually(|| harness.store.is_sleeping()).await;
    eventually(|| !harness.speaker.spoken().is_empty()).await;

    assert!(harness.reloaded_store().is_sleeping());
    assert_eq!(harness.speaker.spoken(), vec!["Going to sleep.".to_string()]);
    assert_eq!(handle.stats().sleeps, 1);
    assert_eq!(harness.main.calls(), 0);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_sleep_is_not_reacknowledged() {
    let harness = Harness::new();
    harness.store.set_sleep_mode(true).unwrap();
    let (recognizer, listens) =
        ScriptedRecognizer::new(vec![Ok(Heard::Speech("sleep jarvis".to_string()))]);

    let handle = harness.listener(recognizer).start();
    eventually(|| listens.load(Ordering::SeqCst) >= 2).await;

    assert!(harness.speaker.spoken().is_empty());
    assert_eq!(handle.stats().sleeps, 0);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_wake_from_sleep_greets_and_launches() {
    let harness = Harness::new();
    harness.store.set_sleep_mode(true).unwrap();
    let (recognizer, _) =
        ScriptedRecognizer::new(vec![Ok(Heard::Speech("hey jarvis".to_string()))]);

    let handle = harness.listener(recognizer).start();
    eventually(|| harness.main.calls() == 1).await;
    eventually(|| !harness.speaker.spoken().is_empty()).await;

    assert!(!harness.store.is_sleeping());
    assert!(!harness.reloaded_store().is_sleeping());
    assert_eq!(
        harness.speaker.spoken(),
        vec!["I'm back. Good morning User. I am here.".to_string()]
    );

    let stats = handle.stats();
    assert_eq!(stats.wakes, 1);
    assert_eq!(stats.launches, 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_wake_while_awake_reattaches() {
    let harness = Harness::new();
    let (recognizer, _) = ScriptedRecognizer::new(vec![
        Ok(Heard::Speech("wake up jarvis".to_string())),
        Ok(Heard::Speech("hello jarvis".to_string())),
    ]);

    let handle = harness.listener(recognizer).start();
    eventually(|| harness.main.calls() == 2).await;
    eventually(|| harness.speaker.spoken().len() == 2).await;

    assert!(
        harness
            .speaker
            .spoken()
            .iter()
            .all(|s| s == "Good morning User. I am here.")
    );
    assert_eq!(handle.stats().launches, 1);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unmatched_utterance_is_dropped() {
    let harness = Harness::new();
    let (recognizer, listens) =
        ScriptedRecognizer::new(vec![Ok(Heard::Speech("what is the weather".to_string()))]);

    let handle = harness.listener(recognizer).start();
    eventually(|| listens.load(Ordering::SeqCst) >= 2).await;

    assert!(harness.speaker.spoken().is_empty());
    assert_eq!(harness.main.calls(), 0);
    assert!(!harness.store.is_sleeping());

    let stats = handle.stats();
    assert_eq!(stats.sleeps + stats.wakes, 0);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_the_loop() {
    let harness = Harness::new();
    let (recognizer, _) = ScriptedRecognizer::new(Vec::new());

    let handle = harness.listener(recognizer).start();
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert!(!handle.is_finished());

    handle.stop().await;
}
