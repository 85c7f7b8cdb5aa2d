//! Persisted lifecycle and memory records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sleep/awake flag shared by the listener and the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    #[serde(default)]
    pub sleep_mode: bool,
}

impl LifecycleState {
    #[must_use]
    pub const fn asleep() -> Self {
        Self { sleep_mode: true }
    }

    #[must_use]
    pub const fn awake() -> Self {
        Self { sleep_mode: false }
    }
}

/// Prefix of keys created by [`MemoryFacts::insert_note`]
pub const NOTE_PREFIX: &str = "note_";

/// Key-value fact memory with case-insensitive keys
///
/// Keys are stored trimmed and lowercased; last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryFacts(BTreeMap<String, String>);

impl MemoryFacts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a fact key for storage and lookup
    #[must_use]
    pub fn normalize_key(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Upsert a fact, returning the previous value
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        self.0.insert(Self::normalize_key(key), value.into().trim().to_string())
    }

    /// Store a free-form statement under a timestamped note key
    pub fn insert_note(&mut self, statement: &str, unix_secs: i64) -> String {
        let mut key = format!("{NOTE_PREFIX}{unix_secs}");
        let mut suffix = 1;
        while self.0.contains_key(&key) {
            key = format!("{NOTE_PREFIX}{unix_secs}_{suffix}");
            suffix += 1;
        }
        self.0.insert(key.clone(), statement.trim().to_string());
        key
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&Self::normalize_key(key)).map(String::as_str)
    }

    /// Facts in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-normalize keys of a mapping read from disk
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut out = Self::new();
        for (key, value) in self.0 {
            out.0.insert(Self::normalize_key(&key), value);
        }
        out
    }
}

/// Whether a fact key was created by [`MemoryFacts::insert_note`]
#[must_use]
pub fn is_note_key(key: &str) -> bool {
    key.starts_with(NOTE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let mut facts = MemoryFacts::new();
        facts.insert("wifi", "old");
        let previous = facts.insert("  WiFi ", "new");

        assert_eq!(previous.as_deref(), Some("old"));
        assert_eq!(facts.len(), 1);
        assert_eq!(facts.get("WIFI"), Some("new"));
    }

    #[test]
    fn note_keys_do_not_collide() {
        let mut facts = MemoryFacts::new();
        let first = facts.insert_note("buy milk", 1_700_000_000);
        let second = facts.insert_note("call bob", 1_700_000_000);

        assert_eq!(first, "note_1700000000");
        assert_eq!(second, "note_1700000000_1");
        assert!(is_note_key(&second));
    }

    #[test]
    fn lifecycle_json_shape() {
        let json = serde_json::to_string(&LifecycleState::asleep()).unwrap();
        assert_eq!(json, r#"{"sleep_mode":true}"#);

        let state: LifecycleState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, LifecycleState::awake());
    }

    #[test]
    fn memory_json_is_flat_object() {
        let facts: MemoryFacts = serde_json::from_str(r#"{"My Name": "Tony"}"#).unwrap();
        let facts = facts.normalized();
        assert_eq!(facts.get("my name"), Some("Tony"));
    }
}
