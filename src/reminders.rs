//! In-process reminder timers
//!
//! Reminders live only as long as the process; each one is a tokio task
//! that sleeps and then speaks through the effect runner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::effects::EffectRunner;
use crate::router::SideEffect;

/// A scheduled reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: Uuid,
    pub task: String,
    pub due_at: DateTime<Utc>,
}

/// Text announced when a reminder fires
#[must_use]
pub fn announcement(task: &str) -> String {
    format!("Reminder: {task}")
}

/// Tracks pending reminder timers
#[derive(Debug, Clone, Default)]
pub struct ReminderScheduler {
    pending: Arc<Mutex<HashMap<Uuid, Reminder>>>,
}

impl ReminderScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce `task` through `runner` after `delay`
    pub fn schedule(&self, task: &str, delay: Duration, runner: EffectRunner) -> Reminder {
        let offset = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        let reminder = Reminder {
            id: Uuid::new_v4(),
            task: task.to_string(),
            due_at: Utc::now()
                .checked_add_signed(offset)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        self.lock().insert(reminder.id, reminder.clone());
        tracing::info!(
            id = %reminder.id,
            task,
            delay_secs = delay.as_secs(),
            "reminder scheduled"
        );

        let pending = Arc::clone(&self.pending);
        let id = reminder.id;
        let text = announcement(task);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
            tracing::info!(%id, "reminder due");
            runner.run(SideEffect::PlayAudio(text)).await;
        });

        reminder
    }

    /// Reminders that have not fired yet, soonest first
    #[must_use]
    pub fn pending(&self) -> Vec<Reminder> {
        let mut reminders: Vec<_> = self.lock().values().cloned().collect();
        reminders.sort_by_key(|r| r.due_at);
        reminders
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Reminder>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
