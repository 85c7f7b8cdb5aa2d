//! Persisted assistant state
//!
//! The sleep/awake flag lives in `jarvis_state.json` and the fact memory in
//! `memory.json`, both under the data directory.

mod store;
mod types;

pub use store::PersistentStateStore;
pub use types::{LifecycleState, MemoryFacts, NOTE_PREFIX, is_note_key};
