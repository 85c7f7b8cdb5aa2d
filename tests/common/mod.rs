//! Shared collaborator doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use jarvis::integrations::{KnowledgeProvider, NewsProvider, WeatherProvider, WeatherReport};
use jarvis::system::{BatteryStatus, Direction, Launcher, SystemControl};
use jarvis::voice::{Heard, Recognizer, Speaker};
use jarvis::{
    AssistantContext, CommandRouter, Config, ContextBuilder, Error, LaunchOutcome, LaunchTarget,
    MainProcess, Result,
};

/// Replays a fixed script, then reports silence forever
pub struct ScriptedRecognizer {
    script: VecDeque<Result<Heard>>,
    listens: Arc<AtomicUsize>,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Result<Heard>>) -> (Self, Arc<AtomicUsize>) {
        let listens = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script: script.into(),
                listens: Arc::clone(&listens),
            },
            listens,
        )
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn calibrate(&mut self, _duration: Duration) -> Result<()> {
        Ok(())
    }

    async fn listen(&mut self, timeout: Duration, _phrase_limit: Duration) -> Result<Heard> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(next) => next,
            None => {
                tokio::time::sleep(timeout).await;
                Ok(Heard::Silence)
            }
        }
    }
}

/// Records everything spoken
#[derive(Default)]
pub struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Counts launch requests; the first one launches, later ones re-attach
#[derive(Default)]
pub struct CountingMain {
    calls: AtomicU32,
}

impl CountingMain {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MainProcess for CountingMain {
    fn ensure_running(&self) -> Result<LaunchOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Ok(LaunchOutcome::Launched { pid: 4242 })
        } else {
            Ok(LaunchOutcome::AlreadyRunning { pid: 4242 })
        }
    }
}

/// Records URLs and programs instead of starting them
#[derive(Default)]
pub struct RecordingLauncher {
    pub urls: Mutex<Vec<String>>,
    pub launched: Mutex<Vec<LaunchTarget>>,
}

impl Launcher for RecordingLauncher {
    fn open_url(&self, url: &str) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn launch(&self, target: &LaunchTarget) -> Result<u32> {
        self.launched.lock().unwrap().push(target.clone());
        Ok(1)
    }
}

/// Device controls with a fixed battery and recorded adjustments
#[derive(Default)]
pub struct FakeControls {
    pub battery: Option<BatteryStatus>,
    pub mute_calls: Mutex<Vec<bool>>,
    pub volume_calls: Mutex<Vec<Direction>>,
}

#[async_trait]
impl SystemControl for FakeControls {
    async fn battery(&self) -> Result<BatteryStatus> {
        self.battery.ok_or_else(|| Error::NotFound("battery".to_string()))
    }

    async fn change_volume(&self, direction: Direction) -> Result<()> {
        self.volume_calls.lock().unwrap().push(direction);
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.mute_calls.lock().unwrap().push(muted);
        Ok(())
    }

    async fn change_brightness(&self, _direction: Direction) -> Result<()> {
        Err(Error::Unsupported("brightness".to_string()))
    }

    async fn set_brightness(&self, _percent: u8) -> Result<()> {
        Ok(())
    }
}

/// Weather provider that always fails at the transport level
pub struct FailingWeather {
    pub calls: AtomicUsize,
}

#[async_trait]
impl WeatherProvider for FailingWeather {
    async fn fetch(&self, _city: &str) -> Result<WeatherReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Provider("connection reset".to_string()))
    }
}

/// Weather provider with a fixed report
pub struct FixedWeather;

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn fetch(&self, city: &str) -> Result<WeatherReport> {
        if city == "atlantis" {
            return Err(Error::NotFound(format!("city {city}")));
        }
        Ok(WeatherReport {
            description: "clear sky".to_string(),
            temperature_c: 21.5,
        })
    }
}

/// News provider with no configured key
pub struct UnconfiguredNews;

#[async_trait]
impl NewsProvider for UnconfiguredNews {
    async fn headlines(&self, _topic: Option<&str>) -> Result<Vec<String>> {
        Err(Error::NotConfigured("news API key".to_string()))
    }
}

/// Knowledge provider that records topics
#[derive(Default)]
pub struct RecordingKnowledge {
    pub topics: Mutex<Vec<String>>,
}

#[async_trait]
impl KnowledgeProvider for RecordingKnowledge {
    async fn summarize(&self, topic: &str) -> Result<String> {
        self.topics.lock().unwrap().push(topic.to_string());
        Ok(format!("{topic} was a physicist. He developed relativity."))
    }
}

/// Doubles shared by a router under test
pub struct Doubles {
    pub speaker: Arc<RecordingSpeaker>,
    pub launcher: Arc<RecordingLauncher>,
    pub controls: Arc<FakeControls>,
    pub knowledge: Arc<RecordingKnowledge>,
}

impl Doubles {
    pub fn new() -> Self {
        Self {
            speaker: Arc::default(),
            launcher: Arc::default(),
            controls: Arc::new(FakeControls {
                battery: Some(BatteryStatus {
                    percent: 80,
                    charging: true,
                }),
                ..FakeControls::default()
            }),
            knowledge: Arc::default(),
        }
    }

    /// Context builder rooted at `dir` with every collaborator doubled
    pub fn builder(&self, dir: &Path) -> ContextBuilder {
        AssistantContext::builder(Config::with_data_dir(dir))
            .speaker(self.speaker.clone())
            .launcher(self.launcher.clone())
            .controls(self.controls.clone())
            .knowledge(self.knowledge.clone())
            .weather(Arc::new(FixedWeather))
            .news(Arc::new(UnconfiguredNews))
    }

    pub fn router(&self, dir: &Path) -> CommandRouter {
        CommandRouter::new(Arc::new(self.builder(dir).build().unwrap()))
    }
}

/// Poll `condition` on paused time until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
