//! Router output types

use std::fmt;

use crate::supervisor::LaunchTarget;

/// Identifies the rule that produced a reply
///
/// Variants sharing a [`RuleId::priority`] belong to the same slot of the
/// dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    /// Blank utterance, answered before the table
    Empty,
    /// Sleeping gate, answered before the table
    Sleeping,
    Sleep,
    Wake,
    Identity,
    SelfQuery,
    MemoryWrite,
    MemoryRead,
    Weather,
    News,
    Browser,
    Time,
    Battery,
    Math,
    Volume,
    Power,
    Brightness,
    Knowledge,
    Reminder,
    Vision,
    Joke,
    Fallback,
}

impl RuleId {
    /// Position in the dispatch order (1-12); pre-table gates report 0
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Empty | Self::Sleeping => 0,
            Self::Sleep | Self::Wake => 1,
            Self::Identity => 2,
            Self::SelfQuery => 3,
            Self::MemoryWrite => 4,
            Self::MemoryRead => 5,
            Self::Weather | Self::News => 6,
            Self::Browser => 7,
            Self::Time
            | Self::Battery
            | Self::Math
            | Self::Volume
            | Self::Power
            | Self::Brightness => 8,
            Self::Knowledge => 9,
            Self::Reminder => 10,
            Self::Vision | Self::Joke => 11,
            Self::Fallback => 12,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Work performed after the reply is delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Open a URL in the default browser
    OpenUrl(String),
    /// Start an OS program detached
    RunProcess(LaunchTarget),
    /// Speak text through the session speaker
    PlayAudio(String),
    /// Announce `task` after `minutes`
    ScheduleTimer { task: String, minutes: u64 },
}

/// Text for the user plus an optional side effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub effect: Option<SideEffect>,
}

impl Reply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            effect: None,
        }
    }

    #[must_use]
    pub fn with_effect(text: impl Into<String>, effect: SideEffect) -> Self {
        Self {
            text: text.into(),
            effect: Some(effect),
        }
    }
}

/// One router invocation's result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub rule: RuleId,
    pub reply: Reply,
}
