//! Information rules backed by external collaborators

use std::sync::LazyLock;

use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;

use super::{CommandRouter, Reply, RuleInput, SideEffect};
use crate::Error;
use crate::phrases::capitalize;

/// Reply when no rule matched and no conversation provider is attached
pub(super) const STATIC_FALLBACK: &str = "Sorry, I don't understand that.";

const KNOWLEDGE_PREFIXES: &[&str] = &["who is", "what is", "tell me about"];

const JOKES: &[&str] = &[
    "I told my computer I needed a break, and it said no problem, it would go to sleep.",
    "There are 10 kinds of people: those who understand binary and those who don't.",
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "I would tell you a UDP joke, but you might not get it.",
    "A SQL query walks into a bar, goes up to two tables and asks, can I join you?",
    "Why was the function sad after the party? It didn't get any callbacks.",
];

static REMINDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"remind me to (.+?) in (\d+) minute").expect("valid regex")
});

pub(super) fn is_weather(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    input.text.contains("weather in") || input.text.starts_with("weather ")
}

fn weather_city(text: &str) -> &str {
    match text.split_once("weather in") {
        Some((_, city)) => city.trim(),
        None => text.strip_prefix("weather").unwrap_or(text).trim(),
    }
}

pub(super) fn weather<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let city = weather_city(input.text).trim_end_matches('?');
        if city.is_empty() {
            return Reply::text("Which city do you want the weather for?");
        }

        match router.ctx.weather.fetch(city).await {
            Ok(report) => Reply::text(format!(
                "The weather in {} is {} with temperature {}°C.",
                capitalize(city),
                report.description,
                report.temperature_c
            )),
            Err(Error::NotFound(_)) => Reply::text("Couldn't fetch weather. Check the city name."),
            Err(Error::NotConfigured(_)) => Reply::text("Weather API key not set."),
            Err(e) => {
                tracing::warn!(error = %e, city, "weather lookup failed");
                Reply::text("Error retrieving weather.")
            }
        }
    }
    .boxed()
}

pub(super) fn is_news(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    let text = input.text;
    text == "news" || text.starts_with("news in") || text.starts_with("news about")
}

fn news_topic(text: &str) -> Option<&str> {
    ["news about", "news in"]
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
}

pub(super) fn news<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let topic = news_topic(input.text);
        match router.ctx.news.headlines(topic).await {
            Ok(headlines) if headlines.is_empty() => Reply::text("No news found."),
            Ok(headlines) => Reply::text(
                headlines
                    .iter()
                    .enumerate()
                    .map(|(i, title)| format!("Headline {}: {title}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Err(Error::NotConfigured(_)) => Reply::text("News API key not set."),
            Err(Error::Provider(e)) => {
                tracing::warn!(error = %e, "news provider rejected request");
                Reply::text("Couldn't fetch news at the moment.")
            }
            Err(e) => {
                tracing::warn!(error = %e, "news lookup failed");
                Reply::text("Error retrieving news.")
            }
        }
    }
    .boxed()
}

fn knowledge_topic(text: &str) -> Option<&str> {
    KNOWLEDGE_PREFIXES.iter().find_map(|prefix| {
        let rest = text.strip_prefix(prefix)?;
        (rest.is_empty() || rest.starts_with(' ')).then(|| rest.trim())
    })
}

pub(super) fn is_knowledge(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    knowledge_topic(input.text).is_some()
}

pub(super) fn knowledge<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let topic = knowledge_topic(input.text)
            .unwrap_or_default()
            .trim_end_matches('?')
            .trim();
        if topic.is_empty() {
            return Reply::text("Please be more specific.");
        }

        match router.ctx.knowledge.summarize(topic).await {
            Ok(summary) => Reply::text(summary),
            Err(e) => {
                tracing::debug!(error = %e, topic, "knowledge lookup failed");
                Reply::text("Sorry, I couldn't find information on that.")
            }
        }
    }
    .boxed()
}

pub(super) fn is_reminder(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    input.text.contains("remind me")
}

pub(super) fn reminder(_router: &CommandRouter, input: &RuleInput<'_>) -> Reply {
    const USAGE: &str = "Say something like 'remind me to call mom in 10 minutes'.";

    let Some(captures) = REMINDER_PATTERN.captures(input.text) else {
        return Reply::text(USAGE);
    };
    let task = captures[1].trim().to_string();
    let Ok(minutes) = captures[2].parse::<u64>() else {
        return Reply::text(USAGE);
    };

    Reply::with_effect(
        format!("Reminder set for {task} in {minutes} minutes."),
        SideEffect::ScheduleTimer { task, minutes },
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisionRequest {
    Faces,
    Qr,
}

fn vision_request(text: &str) -> Option<VisionRequest> {
    if text.contains("detect face") || text.contains("scan face") {
        Some(VisionRequest::Faces)
    } else if text.contains("scan qr") || text.contains("read qr code") {
        Some(VisionRequest::Qr)
    } else {
        None
    }
}

pub(super) fn is_vision(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    vision_request(input.text).is_some()
}

pub(super) fn vision<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let Some(request) = vision_request(input.text) else {
            return Reply::text(STATIC_FALLBACK);
        };

        let Some(camera) = router.ctx.vision.as_ref() else {
            return Reply::text(match request {
                VisionRequest::Faces => "Face detection module not available.",
                VisionRequest::Qr => "QR scanner module not available.",
            });
        };

        let (result, failure) = match request {
            VisionRequest::Faces => (camera.detect_faces().await, "Face detection failed."),
            VisionRequest::Qr => (camera.detect_qr().await, "QR scanning failed."),
        };
        match result {
            Ok(summary) => Reply::text(summary),
            Err(e) => {
                tracing::warn!(error = %e, ?request, "vision helper failed");
                Reply::text(failure)
            }
        }
    }
    .boxed()
}

pub(super) fn is_joke(_router: &CommandRouter, input: &RuleInput<'_>) -> bool {
    input.text.contains("joke")
}

pub(super) fn joke(_router: &CommandRouter, _input: &RuleInput<'_>) -> Reply {
    let nanos = chrono::Utc::now().timestamp_subsec_nanos();
    let pick = usize::try_from(nanos).unwrap_or_default() % JOKES.len();
    Reply::text(JOKES[pick])
}

pub(super) const fn always(_router: &CommandRouter, _input: &RuleInput<'_>) -> bool {
    true
}

pub(super) fn fallback<'a>(
    router: &'a CommandRouter,
    input: &'a RuleInput<'a>,
) -> BoxFuture<'a, Reply> {
    async move {
        let Some(conversation) = router.ctx.conversation.as_ref() else {
            return Reply::text(STATIC_FALLBACK);
        };
        match conversation.respond(input.text).await {
            Ok(text) => Reply::text(text),
            Err(e) => {
                tracing::warn!(error = %e, "conversation provider failed");
                Reply::text("I couldn't understand that.")
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_weather_city() {
        assert_eq!(weather_city("what's the weather in new york"), "new york");
        assert_eq!(weather_city("weather paris"), "paris");
        assert_eq!(weather_city("weather in"), "");
    }

    #[test]
    fn extracts_news_topic() {
        assert_eq!(news_topic("news about rust"), Some("rust"));
        assert_eq!(news_topic("news in sports"), Some("sports"));
        assert_eq!(news_topic("news"), None);
        assert_eq!(news_topic("news about "), None);
    }

    #[test]
    fn knowledge_prefix_needs_word_boundary() {
        assert_eq!(knowledge_topic("who is einstein"), Some("einstein"));
        assert_eq!(knowledge_topic("tell me about rust"), Some("rust"));
        assert_eq!(knowledge_topic("who is"), Some(""));
        assert_eq!(knowledge_topic("who isabel"), None);
    }

    #[test]
    fn reminder_pattern_captures_task_and_minutes() {
        let captures = REMINDER_PATTERN
            .captures("remind me to call mom in 10 minutes")
            .unwrap();
        assert_eq!(&captures[1], "call mom");
        assert_eq!(&captures[2], "10");
        assert!(REMINDER_PATTERN.captures("remind me about lunch").is_none());
    }

    #[test]
    fn vision_requests() {
        assert_eq!(
            vision_request("please detect face"),
            Some(VisionRequest::Faces)
        );
        assert_eq!(vision_request("read qr code"), Some(VisionRequest::Qr));
        assert_eq!(vision_request("scan the room"), None);
    }
}
