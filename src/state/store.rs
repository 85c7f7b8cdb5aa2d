//! File-backed store for the lifecycle flag and fact memory

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{LifecycleState, MemoryFacts};
use crate::config::Config;
use crate::{Error, Result};

/// Last values seen on disk, used when a read fails
#[derive(Debug, Default)]
struct Cached {
    lifecycle: LifecycleState,
    facts: MemoryFacts,
}

/// Durable sleep flag and fact memory
///
/// Both records are re-read from disk on every call because the wake
/// listener and the session run as separate processes. Every
/// read-modify-write cycle holds the store mutex for its whole duration.
#[derive(Debug)]
pub struct PersistentStateStore {
    state_path: PathBuf,
    memory_path: PathBuf,
    cached: Mutex<Cached>,
}

impl PersistentStateStore {
    /// Create a store over explicit file paths
    #[must_use]
    pub fn new(state_path: impl Into<PathBuf>, memory_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            memory_path: memory_path.into(),
            cached: Mutex::new(Cached::default()),
        }
    }

    /// Create a store at the configured data directory
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_path(), config.memory_path())
    }

    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    #[must_use]
    pub fn memory_path(&self) -> &Path {
        &self.memory_path
    }

    fn lock(&self) -> MutexGuard<'_, Cached> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the lifecycle flag; missing or corrupt storage reads as awake
    #[must_use]
    pub fn load_lifecycle(&self) -> LifecycleState {
        let mut cached = self.lock();
        Self::read_lifecycle(&self.state_path, &mut cached)
    }

    /// Whether the assistant is currently asleep
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.load_lifecycle().sleep_mode
    }

    /// Overwrite the lifecycle flag
    ///
    /// # Errors
    ///
    /// Returns error if the state file cannot be written; the in-memory
    /// copy is updated regardless
    pub fn save_lifecycle(&self, state: LifecycleState) -> Result<()> {
        let mut cached = self.lock();
        cached.lifecycle = state;
        write_json(&self.state_path, &state)
    }

    /// Set the sleep flag, returning the previous value
    ///
    /// # Errors
    ///
    /// Returns error if the state file cannot be written
    pub fn set_sleep_mode(&self, sleep_mode: bool) -> Result<bool> {
        let mut cached = self.lock();
        let previous = Self::read_lifecycle(&self.state_path, &mut cached).sleep_mode;
        let next = LifecycleState { sleep_mode };
        cached.lifecycle = next;
        write_json(&self.state_path, &next)?;

        if previous != sleep_mode {
            tracing::info!(sleep_mode, "lifecycle state changed");
        }
        Ok(previous)
    }

    /// Load all facts; missing or corrupt storage reads as empty
    #[must_use]
    pub fn facts(&self) -> MemoryFacts {
        let mut cached = self.lock();
        Self::read_facts(&self.memory_path, &mut cached)
    }

    /// Overwrite all facts
    ///
    /// # Errors
    ///
    /// Returns error if the memory file cannot be written; the in-memory
    /// copy is updated regardless
    pub fn save_facts(&self, facts: &MemoryFacts) -> Result<()> {
        let mut cached = self.lock();
        cached.facts = facts.clone();
        write_json(&self.memory_path, facts)
    }

    /// Apply `update` to the current facts and persist the result
    ///
    /// # Errors
    ///
    /// Returns error if the memory file cannot be written
    pub fn update_facts<R>(&self, update: impl FnOnce(&mut MemoryFacts) -> R) -> Result<R> {
        let mut cached = self.lock();
        let mut facts = Self::read_facts(&self.memory_path, &mut cached);
        let out = update(&mut facts);
        let written = write_json(&self.memory_path, &facts);
        cached.facts = facts;
        written.map(|()| out)
    }

    /// Upsert one fact
    ///
    /// # Errors
    ///
    /// Returns error if the memory file cannot be written
    pub fn remember(&self, key: &str, value: &str) -> Result<Option<String>> {
        let previous = self.update_facts(|facts| facts.insert(key, value))?;
        tracing::debug!(key = %MemoryFacts::normalize_key(key), "fact stored");
        Ok(previous)
    }

    /// Store a free-form statement under a timestamped note key
    ///
    /// # Errors
    ///
    /// Returns error if the memory file cannot be written
    pub fn remember_note(&self, statement: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let key = self.update_facts(|facts| facts.insert_note(statement, now))?;
        tracing::debug!(key = %key, "note stored");
        Ok(key)
    }

    fn read_lifecycle(path: &Path, cached: &mut Cached) -> LifecycleState {
        match read_json::<LifecycleState>(path) {
            ReadOutcome::Value(state) => {
                cached.lifecycle = state;
                state
            }
            ReadOutcome::Missing | ReadOutcome::Corrupt => {
                cached.lifecycle = LifecycleState::default();
                cached.lifecycle
            }
            ReadOutcome::Failed => cached.lifecycle,
        }
    }

    fn read_facts(path: &Path, cached: &mut Cached) -> MemoryFacts {
        match read_json::<MemoryFacts>(path) {
            ReadOutcome::Value(facts) => {
                cached.facts = facts.normalized();
                cached.facts.clone()
            }
            ReadOutcome::Missing | ReadOutcome::Corrupt => {
                cached.facts = MemoryFacts::default();
                MemoryFacts::default()
            }
            ReadOutcome::Failed => cached.facts.clone(),
        }
    }
}

enum ReadOutcome<T> {
    Value(T),
    Missing,
    Corrupt,
    Failed,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ReadOutcome<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ReadOutcome::Missing,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read state file");
            return ReadOutcome::Failed;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => ReadOutcome::Value(value),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "corrupt state file, using defaults"
            );
            ReadOutcome::Corrupt
        }
    }
}

/// Serialize to a sibling temp file, then rename over `path`
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_vec_pretty(value)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> PersistentStateStore {
        PersistentStateStore::new(dir.join("jarvis_state.json"), dir.join("memory.json"))
    }

    #[test]
    fn missing_files_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(!store.is_sleeping());
        assert!(store.facts().is_empty());
    }

    #[test]
    fn sleep_mode_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let previous = store.set_sleep_mode(true).unwrap();
        assert!(!previous);

        let reloaded = store_in(dir.path());
        assert!(reloaded.is_sleeping());
        assert!(reloaded.set_sleep_mode(false).unwrap());
    }

    #[test]
    fn corrupt_files_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jarvis_state.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("memory.json"), "[1, 2").unwrap();
        let store = store_in(dir.path());

        assert_eq!(store.load_lifecycle(), LifecycleState::awake());
        assert!(store.facts().is_empty());
    }

    #[test]
    fn facts_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        store_in(dir.path()).remember("WiFi Password", "hunter2").unwrap();

        let store = store_in(dir.path());
        assert_eq!(store.facts().get("wifi password"), Some("hunter2"));

        let raw = std::fs::read_to_string(dir.path().join("memory.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["wifi password"], "hunter2");
    }

    #[test]
    fn saved_lifecycle_overwrites_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.save_lifecycle(LifecycleState::asleep()).unwrap();
        assert!(store_in(dir.path()).is_sleeping());

        store.save_lifecycle(LifecycleState::awake()).unwrap();
        assert_eq!(store_in(dir.path()).load_lifecycle(), LifecycleState::awake());

        let raw = std::fs::read_to_string(dir.path().join("jarvis_state.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"sleep_mode": false}));
    }

    #[test]
    fn saved_facts_replace_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.remember("old key", "old value").unwrap();

        let mut facts = MemoryFacts::new();
        facts.insert("Favorite Color", "blue");
        store.save_facts(&facts).unwrap();

        let reloaded = store_in(dir.path()).facts();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("favorite color"), Some("blue"));
        assert_eq!(reloaded.get("old key"), None);
    }

    #[test]
    fn note_is_stored_with_timestamp_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let key = store.remember_note("the keys are in the drawer").unwrap();
        assert!(key.starts_with("note_"));
        assert_eq!(store.facts().get(&key), Some("the keys are in the drawer"));
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store_in(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store.remember(&format!("key{i}"), "value").unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.facts().len(), 8);
    }
}
