//! Sleep, wake and greeting phrases
//!
//! Matching is case-insensitive substring containment over a trimmed,
//! lowercased utterance.

use crate::config::PhraseOverrides;

/// An ordered set of trigger phrases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhraseSet {
    phrases: Vec<String>,
}

impl PhraseSet {
    #[must_use]
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| normalize(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// First phrase contained in `utterance`
    #[must_use]
    pub fn find(&self, utterance: &str) -> Option<&str> {
        let utterance = normalize(utterance);
        self.phrases
            .iter()
            .find(|p| utterance.contains(p.as_str()))
            .map(String::as_str)
    }

    #[must_use]
    pub fn matches(&self, utterance: &str) -> bool {
        self.find(utterance).is_some()
    }

    /// Whether `utterance` is exactly one of the phrases
    #[must_use]
    pub fn is_exact(&self, utterance: &str) -> bool {
        let utterance = normalize(utterance);
        self.phrases.iter().any(|p| *p == utterance)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.phrases
    }
}

/// Phrases derived from the assistant's name
#[derive(Debug, Clone)]
pub struct PhraseBook {
    name: String,
    pub sleep: PhraseSet,
    pub wake: PhraseSet,
    pub greetings: PhraseSet,
}

impl PhraseBook {
    /// Phrases accepted inside a session
    ///
    /// The wake set includes the bare name, so any utterance addressing
    /// the assistant wakes it.
    #[must_use]
    pub fn for_session(name: &str) -> Self {
        let n = normalize(name);
        Self {
            sleep: PhraseSet::new([
                "go to sleep".to_string(),
                format!("sleep {n}"),
                format!("put {n} to sleep"),
                format!("{n} go to sleep"),
                format!("sleep now {n}"),
            ]),
            wake: PhraseSet::new([
                format!("wake up {n}"),
                "wake up".to_string(),
                format!("wake {n}"),
                format!("{n} wake up"),
                format!("hey {n}"),
                n.clone(),
            ]),
            greetings: Self::greetings_for(&n),
            name: n,
        }
    }

    /// Phrases the background listener reacts to
    ///
    /// Every phrase carries the name since the listener hears all nearby
    /// speech.
    #[must_use]
    pub fn for_listener(name: &str) -> Self {
        let n = normalize(name);
        Self {
            sleep: PhraseSet::new([
                format!("go to sleep {n}"),
                format!("sleep {n}"),
                format!("{n} go to sleep"),
                format!("sleep now {n}"),
            ]),
            wake: PhraseSet::new([
                format!("wake up {n}"),
                format!("hey {n}"),
                format!("wake {n}"),
                format!("{n} wake up"),
                format!("hello {n}"),
            ]),
            greetings: Self::greetings_for(&n),
            name: n,
        }
    }

    /// Replace sets with configured overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: &PhraseOverrides) -> Self {
        if let Some(sleep) = &overrides.sleep {
            self.sleep = PhraseSet::new(sleep);
        }
        if let Some(wake) = &overrides.wake {
            self.wake = PhraseSet::new(wake);
        }
        self
    }

    fn greetings_for(n: &str) -> PhraseSet {
        PhraseSet::new([format!("hey {n}"), format!("hello {n}"), n.to_string()])
    }

    /// Lowercase assistant name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assistant name with its first letter capitalized
    #[must_use]
    pub fn display_name(&self) -> String {
        capitalize(&self.name)
    }
}

/// Time-of-day greeting for a local hour (0-23)
#[must_use]
pub fn greeting_for_hour(hour: u32, user: &str) -> String {
    let part = match hour {
        5..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    };
    format!("Good {part} {user}. I am here.")
}

/// Trimmed lowercase form used for all matching
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Uppercase the first character of each word
#[must_use]
pub fn capitalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_phrases_require_the_name() {
        let book = PhraseBook::for_listener("Jarvis");
        assert!(book.sleep.matches("okay jarvis go to sleep now"));
        assert!(!book.sleep.matches("I should go to sleep"));
        assert!(book.wake.matches("Hey Jarvis"));
        assert!(!book.wake.matches("wake up"));
    }

    #[test]
    fn session_wake_includes_bare_name() {
        let book = PhraseBook::for_session("jarvis");
        assert!(book.wake.matches("jarvis what time is it"));
        assert!(book.greetings.is_exact("  Hey Jarvis "));
        assert!(!book.greetings.is_exact("hey jarvis open youtube"));
    }

    #[test]
    fn overrides_replace_sets() {
        let overrides = PhraseOverrides {
            sleep: Some(vec!["Take A Nap".to_string()]),
            wake: None,
        };
        let book = PhraseBook::for_listener("friday").with_overrides(&overrides);
        assert!(book.sleep.matches("friday take a nap"));
        assert!(!book.sleep.matches("sleep friday"));
        assert!(book.wake.matches("hey friday"));
    }

    #[test]
    fn greeting_boundaries() {
        assert_eq!(greeting_for_hour(4, "Tony"), "Good evening Tony. I am here.");
        assert_eq!(greeting_for_hour(5, "Tony"), "Good morning Tony. I am here.");
        assert_eq!(greeting_for_hour(11, "Tony"), "Good morning Tony. I am here.");
        assert_eq!(
            greeting_for_hour(12, "Tony"),
            "Good afternoon Tony. I am here."
        );
        assert_eq!(
            greeting_for_hour(17, "Tony"),
            "Good afternoon Tony. I am here."
        );
        assert_eq!(greeting_for_hour(18, "Tony"), "Good evening Tony. I am here.");
    }

    #[test]
    fn capitalize_words() {
        assert_eq!(capitalize("command prompt"), "Command Prompt");
        assert_eq!(capitalize("jarvis"), "Jarvis");
    }
}
