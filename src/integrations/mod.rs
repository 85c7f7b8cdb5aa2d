//! External information providers
//!
//! Each provider sits behind a trait so the router can be exercised with
//! doubles. HTTP clients use a per-request timeout and a configurable base
//! URL.

mod conversation;
mod knowledge;
mod news;
mod vision;
mod weather;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use conversation::OpenAiConversation;
pub use knowledge::{WikipediaClient, first_sentences};
pub use news::NewsApiClient;
pub use vision::ExternalVision;
pub use weather::OpenWeatherClient;

/// Per-request timeout for provider calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Current conditions for a city
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub description: String,
    pub temperature_c: f64,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current weather in `city`
    ///
    /// Returns `Error::NotFound` for an unknown city and
    /// `Error::NotConfigured` when no API key is set.
    async fn fetch(&self, city: &str) -> Result<WeatherReport>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Up to three headlines about `topic`, or top headlines when `None`
    async fn headlines(&self, topic: Option<&str>) -> Result<Vec<String>>;
}

#[async_trait]
pub trait KnowledgeProvider: Send + Sync {
    /// A short encyclopedia summary of `topic`
    async fn summarize(&self, topic: &str) -> Result<String>;
}

#[async_trait]
pub trait ConversationProvider: Send + Sync {
    /// Free-form reply to an utterance no rule handled
    async fn respond(&self, text: &str) -> Result<String>;
}

#[async_trait]
pub trait CameraVision: Send + Sync {
    /// Run face detection and describe the result
    async fn detect_faces(&self) -> Result<String>;

    /// Scan for a QR code and return its contents
    async fn detect_qr(&self) -> Result<String>;
}

/// HTTP client shared shape for all providers
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialized
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("jarvis/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn trim_base(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}
