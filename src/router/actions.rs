//! Browser and application launch rules

use super::{CommandRouter, Reply, RuleInput, SideEffect};
use crate::system::close_browser_command;

const YOUTUBE_URL: &str = "https://www.youtube.com";
const YOUTUBE_SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";
const GOOGLE_URL: &str = "https://www.google.com";
const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search?q=";
const GITHUB_URL: &str = "https://www.github.com";

const SEARCH_PHRASES: &[&str] = &[
    "open chrome and search about",
    "search in chrome",
    "search about",
];

/// Browser or app action named by an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action<'a> {
    PlayOnYoutube(&'a str),
    OpenYoutube,
    Search(&'a str),
    CloseBrowser { youtube: bool },
    OpenGoogle,
    OpenGithub,
    OpenApp,
}

fn after<'a>(text: &'a str, phrase: &str) -> Option<&'a str> {
    text.split_once(phrase).map(|(_, rest)| rest.trim())
}

fn is_search(text: &str) -> bool {
    text.contains("open chrome and search about")
        || text.contains("search in chrome")
        || (text.contains("search about") && text.contains("chrome"))
}

fn action<'a>(router: &CommandRouter, text: &'a str) -> Option<Action<'a>> {
    if let Some(query) = after(text, "open youtube and play") {
        return Some(Action::PlayOnYoutube(query));
    }
    if text.contains("open youtube") {
        return Some(Action::OpenYoutube);
    }
    if is_search(text) {
        let topic = SEARCH_PHRASES
            .iter()
            .find_map(|phrase| after(text, phrase))
            .unwrap_or_default();
        return Some(Action::Search(topic));
    }
    if text.contains("close chrome") {
        return Some(Action::CloseBrowser { youtube: false });
    }
    if text.contains("close youtube") {
        return Some(Action::CloseBrowser { youtube: true });
    }
    if text.contains("open google") {
        return Some(Action::OpenGoogle);
    }
    if text.contains("open github") {
        return Some(Action::OpenGithub);
    }
    router.ctx.apps.find(text).map(|_| Action::OpenApp)
}

pub(super) fn is_browser(router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    action(router, input.text).is_some()
}

pub(super) fn browser(router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    let Some(action) = action(router, input.text) else {
        return Reply::text("I couldn't understand that.");
    };

    match action {
        Action::PlayOnYoutube(query) if !query.is_empty() => Reply::with_effect(
            format!("Searching YouTube for {query}."),
            SideEffect::OpenUrl(format!("{YOUTUBE_SEARCH_URL}{}", urlencoding::encode(query))),
        ),
        Action::PlayOnYoutube(_) | Action::OpenYoutube => Reply::with_effect(
            "Opening YouTube.",
            SideEffect::OpenUrl(YOUTUBE_URL.to_string()),
        ),
        Action::Search("") => Reply::text("What would you like me to search for?"),
        Action::Search(topic) => Reply::with_effect(
            format!("Searching for {topic}."),
            SideEffect::OpenUrl(format!("{GOOGLE_SEARCH_URL}{}", urlencoding::encode(topic))),
        ),
        Action::CloseBrowser { youtube } => {
            let (done, failed) = if youtube {
                ("Closed YouTube.", "Couldn't close YouTube.")
            } else {
                ("Closed Google Chrome.", "Couldn't close Chrome.")
            };
            match close_browser_command(std::env::consts::OS) {
                Some(command) => Reply::with_effect(done, SideEffect::RunProcess(command)),
                None => Reply::text(failed),
            }
        }
        Action::OpenGoogle => Reply::with_effect(
            "Opening Google.",
            SideEffect::OpenUrl(GOOGLE_URL.to_string()),
        ),
        Action::OpenGithub => Reply::with_effect(
            "Opening GitHub.",
            SideEffect::OpenUrl(GITHUB_URL.to_string()),
        ),
        Action::OpenApp => open_app(router, input.text),
    }
}

fn open_app(router: &CommandRouter, text: &str) -> Reply {
    let Some(app) = router.ctx.apps.find(text) else {
        return Reply::text("I couldn't understand that.");
    };
    match app.resolve() {
        Some(target) => Reply::with_effect(
            format!("Opening {}.", app.display()),
            SideEffect::RunProcess(target),
        ),
        None => {
            tracing::debug!(app = app.key(), "no installed program for app");
            Reply::text(format!("Couldn't open {}.", app.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_phrases() {
        assert!(is_search("open chrome and search about rust"));
        assert!(is_search("search in chrome borrow checker"));
        assert!(is_search("search about tokio on chrome"));
        assert!(!is_search("search about tokio"));
    }

    #[test]
    fn after_phrase_is_trimmed() {
        assert_eq!(
            after("open youtube and play  lofi ", "open youtube and play"),
            Some("lofi")
        );
        assert_eq!(after("open youtube", "open youtube and play"), None);
    }
}
