//! Lifecycle, identity and fact memory rules

use super::{CommandRouter, Reply, RuleInput};
use crate::state::is_note_key;

const IDENTITY_PHRASES: &[&str] = &["who are you", "what is your name", "what's your name"];
const SELF_PHRASES: &[&str] = &["who am i", "what is my name", "what's my name"];
const RECALL_PREFIXES: &[&str] = &["what is", "what's", "who is"];

pub(super) fn sleeping_reply(router: &CommandRouter) -> String {
    format!(
        "I am sleeping. Say 'wake up {}' to activate me.",
        router.ctx.phrases.display_name()
    )
}

pub(super) fn is_sleep(router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    router.ctx.phrases.sleep.matches(input.text)
}

pub(super) fn sleep(router: &CommandRouter, _input: &RuleInput<'_>) -> Reply {
    match router.ctx.store.set_sleep_mode(true) {
        Ok(_) => Reply::text(format!(
            "Going to sleep. Say 'wake up {}' to wake me.",
            router.ctx.phrases.display_name()
        )),
        Err(e) => {
            tracing::warn!(error = %e, "failed to persist sleep mode");
            Reply::text("Could not enter sleep mode.")
        }
    }
}

/// Wake phrases only act while asleep or as a bare greeting
pub(super) fn is_wake(router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    let phrases = &router.ctx.phrases;
    phrases.wake.matches(input.text)
        && (input.sleeping
            || phrases.greetings.is_exact(input.text)
            || phrases.wake.is_exact(input.text))
}

pub(super) fn wake(router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    if !input.sleeping {
        return Reply::text(format!(
            "Hello {}, I'm listening.",
            router.ctx.config.user_name
        ));
    }
    if let Err(e) = router.ctx.store.set_sleep_mode(false) {
        tracing::warn!(error = %e, "failed to persist wake");
    }
    Reply::text("I'm back. How can I help you?")
}

pub(super) fn is_identity(router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    let text = input.text;
    IDENTITY_PHRASES.iter().any(|p| text.contains(p))
        || text.starts_with("your name")
        || text == format!("who is {}", router.ctx.phrases.name())
}

pub(super) fn identity(router: &CommandRouter, _input: &RuleInput<'_>) -> Reply {
    Reply::text(format!(
        "I am {}, your personal AI assistant. I can open apps, fetch news and weather, set reminders, and more.",
        router.ctx.phrases.display_name()
    ))
}

pub(super) fn is_self_query(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    SELF_PHRASES.iter().any(|p| input.text.contains(p))
}

pub(super) fn self_query(_router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    let name = input
        .facts
        .iter()
        .find(|(key, value)| key.contains("name") && !value.is_empty())
        .map(|(_, value)| value);

    match name {
        Some(name) => Reply::text(format!("You are {name}.")),
        None => Reply::text(
            "I don't know your name yet. Tell me by saying 'remember my name is <your name>'.",
        ),
    }
}

pub(super) fn is_memory_write(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    input.text.starts_with("remember")
}

pub(super) fn memory_write(router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    let statement = input.text.strip_prefix("remember").unwrap_or(input.text).trim();
    let statement = statement.strip_prefix("that ").unwrap_or(statement).trim();
    if statement.is_empty() {
        return Reply::text("What should I remember?");
    }

    let store = &router.ctx.store;
    match statement.split_once(" is ") {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            let (key, value) = (key.trim(), value.trim());
            match store.remember(key, value) {
                Ok(_) => Reply::text(format!("Got it. I will remember that {key} is {value}.")),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to store fact");
                    Reply::text("I couldn't remember that properly.")
                }
            }
        }
        _ => match store.remember_note(statement) {
            Ok(key) => {
                tracing::debug!(key, "note stored");
                Reply::text("Okay, I've remembered that.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to store note");
                Reply::text("I couldn't remember that properly.")
            }
        },
    }
}

/// "do you remember" always fires; lookups fire only when a fact matches
pub(super) fn is_memory_read(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    if input.text.contains("do you remember") {
        return true;
    }
    RECALL_PREFIXES.iter().any(|p| input.text.starts_with(p))
        && recalled_fact(input).is_some()
}

pub(super) fn memory_read(_router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    match recalled_fact(input) {
        Some((key, value)) if is_note_key(key) => {
            Reply::text(format!("Yes. You told me: {value}."))
        }
        Some((key, value)) => Reply::text(format!("Yes. {key} is {value}.")),
        None => Reply::text("I don't remember that."),
    }
}

/// First fact, in key order, whose key or value occurs in the utterance
///
/// Values without letters are only found through their key, so a stored
/// number never captures arithmetic.
fn recalled_fact<'a>(input: &RuleInput<'a>) -> Option<(&'a str, &'a str)> {
    input.facts.iter().find(|(key, value)| {
        let key_hit = !is_note_key(key) && contains_words(input.text, key);
        let value_hit =
            value.chars().any(char::is_alphabetic) && contains_words(input.text, value);
        key_hit || value_hit
    })
}

/// Whether `needle` occurs in `text` on word boundaries
fn contains_words(text: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    text.match_indices(needle).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrases_match_on_word_boundaries() {
        assert!(contains_words("what is my wifi password?", "my wifi password"));
        assert!(contains_words("do you remember to buy milk", "to buy milk"));
        assert!(!contains_words("what is a catalog", "cat"));
        assert!(!contains_words("what is 15 plus 2", "5"));
        assert!(!contains_words("anything", ""));
    }
}
