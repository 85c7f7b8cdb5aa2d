//! Ordered rule-based command router
//!
//! An utterance is normalized, checked against the sleeping gate, then
//! tested against [`RULES`] in order. The first rule whose predicate holds
//! produces the reply; later rules are never consulted. Handler failures
//! become fixed replies so the router is always available for the next
//! utterance.

mod actions;
mod info;
pub mod math;
mod memory;
mod reply;
mod system;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::context::AssistantContext;
use crate::phrases::normalize;
use crate::state::MemoryFacts;

pub use reply::{Dispatch, Reply, RuleId, SideEffect};

/// Reply to a blank utterance
pub const EMPTY_REPLY: &str = "I didn't catch that.";

/// What a rule sees of one utterance
#[derive(Debug)]
pub struct RuleInput<'a> {
    /// Trimmed, lowercased utterance
    pub text: &'a str,
    /// Lifecycle state read before dispatch
    pub sleeping: bool,
    /// Facts read before dispatch
    pub facts: &'a MemoryFacts,
}

type Predicate = fn(&CommandRouter, &RuleInput<'_>) -> bool;

#[derive(Clone, Copy)]
enum Handler {
    Sync(fn(&CommandRouter, &RuleInput<'_>) -> Reply),
    Async(for<'a> fn(&'a CommandRouter, &'a RuleInput<'a>) -> BoxFuture<'a, Reply>),
}

struct Rule {
    id: RuleId,
    matches: Predicate,
    handle: Handler,
}

/// Dispatch order; the first matching rule wins
const RULES: &[Rule] = &[
    Rule {
        id: RuleId::Sleep,
        matches: memory::is_sleep,
        handle: Handler::Sync(memory::sleep),
    },
    Rule {
        id: RuleId::Wake,
        matches: memory::is_wake,
        handle: Handler::Sync(memory::wake),
    },
    Rule {
        id: RuleId::Identity,
        matches: memory::is_identity,
        handle: Handler::Sync(memory::identity),
    },
    Rule {
        id: RuleId::SelfQuery,
        matches: memory::is_self_query,
        handle: Handler::Sync(memory::self_query),
    },
    Rule {
        id: RuleId::MemoryWrite,
        matches: memory::is_memory_write,
        handle: Handler::Sync(memory::memory_write),
    },
    Rule {
        id: RuleId::MemoryRead,
        matches: memory::is_memory_read,
        handle: Handler::Sync(memory::memory_read),
    },
    Rule {
        id: RuleId::Weather,
        matches: info::is_weather,
        handle: Handler::Async(info::weather),
    },
    Rule {
        id: RuleId::News,
        matches: info::is_news,
        handle: Handler::Async(info::news),
    },
    Rule {
        id: RuleId::Browser,
        matches: actions::is_browser,
        handle: Handler::Sync(actions::browser),
    },
    Rule {
        id: RuleId::Time,
        matches: system::is_time,
        handle: Handler::Sync(system::time),
    },
    Rule {
        id: RuleId::Battery,
        matches: system::is_battery,
        handle: Handler::Async(system::battery),
    },
    Rule {
        id: RuleId::Math,
        matches: system::is_math,
        handle: Handler::Sync(system::math),
    },
    Rule {
        id: RuleId::Volume,
        matches: system::is_volume,
        handle: Handler::Async(system::volume),
    },
    Rule {
        id: RuleId::Power,
        matches: system::is_power,
        handle: Handler::Sync(system::power),
    },
    Rule {
        id: RuleId::Brightness,
        matches: system::is_brightness,
        handle: Handler::Async(system::brightness),
    },
    Rule {
        id: RuleId::Knowledge,
        matches: info::is_knowledge,
        handle: Handler::Async(info::knowledge),
    },
    Rule {
        id: RuleId::Reminder,
        matches: info::is_reminder,
        handle: Handler::Sync(info::reminder),
    },
    Rule {
        id: RuleId::Vision,
        matches: info::is_vision,
        handle: Handler::Async(info::vision),
    },
    Rule {
        id: RuleId::Joke,
        matches: info::is_joke,
        handle: Handler::Sync(info::joke),
    },
    Rule {
        id: RuleId::Fallback,
        matches: info::always,
        handle: Handler::Async(info::fallback),
    },
];

/// Maps utterances to exactly one reply
#[derive(Clone)]
pub struct CommandRouter {
    ctx: Arc<AssistantContext>,
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("rules", &RULES.len())
            .finish_non_exhaustive()
    }
}

impl CommandRouter {
    #[must_use]
    pub const fn new(ctx: Arc<AssistantContext>) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &AssistantContext {
        &self.ctx
    }

    /// Rule identifiers in evaluation order
    pub fn rule_order() -> impl Iterator<Item = RuleId> {
        RULES.iter().map(|rule| rule.id)
    }

    /// Pick and run the rule for `utterance` without performing its effect
    pub async fn dispatch(&self, utterance: &str) -> Dispatch {
        let text = normalize(utterance);
        if text.is_empty() {
            return Dispatch {
                rule: RuleId::Empty,
                reply: Reply::text(EMPTY_REPLY),
            };
        }

        let sleeping = self.ctx.store.is_sleeping();
        if sleeping && !self.ctx.phrases.wake.matches(&text) {
            return Dispatch {
                rule: RuleId::Sleeping,
                reply: Reply::text(memory::sleeping_reply(self)),
            };
        }

        let facts = self.ctx.store.facts();
        let input = RuleInput {
            text: &text,
            sleeping,
            facts: &facts,
        };

        for rule in RULES {
            if !(rule.matches)(self, &input) {
                continue;
            }
            tracing::debug!(rule = %rule.id, priority = rule.id.priority(), "rule matched");
            let reply = match rule.handle {
                Handler::Sync(handle) => handle(self, &input),
                Handler::Async(handle) => handle(self, &input).await,
            };
            return Dispatch {
                rule: rule.id,
                reply,
            };
        }

        // The fallback predicate always holds
        Dispatch {
            rule: RuleId::Fallback,
            reply: Reply::text(info::STATIC_FALLBACK),
        }
    }

    /// Dispatch `utterance` and submit the reply's effect
    ///
    /// The effect starts only after the reply is built and is not awaited.
    pub async fn execute(&self, utterance: &str) -> Dispatch {
        let dispatch = self.dispatch(utterance).await;
        tracing::info!(rule = %dispatch.rule, "utterance dispatched");
        if let Some(effect) = dispatch.reply.effect.clone() {
            self.ctx.effects.submit(effect);
        }
        dispatch
    }

    /// Run [`execute`](Self::execute) on its own tokio task
    pub fn execute_detached(&self, utterance: impl Into<String>) -> JoinHandle<Dispatch> {
        let router = self.clone();
        let utterance = utterance.into();
        tokio::spawn(async move { router.execute(&utterance).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_are_ordered_by_priority() {
        let priorities: Vec<u8> = CommandRouter::rule_order().map(RuleId::priority).collect();
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(priorities.first(), Some(&1));
        assert_eq!(priorities.last(), Some(&12));
    }

    #[test]
    fn fallback_is_last() {
        assert_eq!(CommandRouter::rule_order().last(), Some(RuleId::Fallback));
        assert_eq!(
            CommandRouter::rule_order().filter(|id| *id == RuleId::Fallback).count(),
            1
        );
    }
}
