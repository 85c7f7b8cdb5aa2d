//! Jarvis - wake-word listener, command router and process supervisor
//!
//! This library provides the core of a desktop voice assistant:
//! - A background wake listener that sleeps and wakes the assistant
//! - An ordered rule table mapping utterances to replies and side effects
//! - A supervisor that launches or re-attaches to the main assistant process
//! - Durable sleep state and fact memory
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Interfaces                        │
//! │    Wake listener   │   Console session   │   Voice    │
//! └─────────┬────────────────────┬───────────────────────┘
//!           │                    │
//! ┌─────────▼─────────┐ ┌────────▼───────────────────────┐
//! │ ProcessSupervisor │ │        CommandRouter            │
//! │  pid record, lock │ │ rules → Reply → EffectRunner   │
//! └─────────┬─────────┘ └────────┬───────────────────────┘
//!           │                    │
//! ┌─────────▼────────────────────▼───────────────────────┐
//! │   PersistentStateStore   │   Integrations   │ System  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod effects;
pub mod error;
pub mod integrations;
pub mod listener;
pub mod phrases;
pub mod reminders;
pub mod router;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod system;
pub mod voice;

pub use config::Config;
pub use context::{AssistantContext, ContextBuilder};
pub use effects::EffectRunner;
pub use error::{Error, RecognitionFailure, Result};
pub use listener::{ListenerHandle, ListenerStats, WakeListener};
pub use phrases::{PhraseBook, PhraseSet};
pub use reminders::{Reminder, ReminderScheduler};
pub use router::{CommandRouter, Dispatch, Reply, RuleId, SideEffect};
pub use session::Session;
pub use state::{LifecycleState, MemoryFacts, PersistentStateStore};
pub use supervisor::{
    InstanceLock, LaunchOutcome, LaunchTarget, MainProcess, ProcessRecord, ProcessSupervisor,
    SupervisedProcess,
};
