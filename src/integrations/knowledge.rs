//! Wikipedia page summaries

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{KnowledgeProvider, http_client, trim_base};
use crate::{Error, Result};

/// Sentences kept from a page summary
const SUMMARY_SENTENCES: usize = 2;

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    extract: String,
}

/// Client for the Wikipedia REST summary endpoint
pub struct WikipediaClient {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
        })
    }
}

#[async_trait]
impl KnowledgeProvider for WikipediaClient {
    async fn summarize(&self, topic: &str) -> Result<String> {
        let title = topic.trim().replace(' ', "_");
        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            urlencoding::encode(&title)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("article {topic}")));
        }
        if !status.is_success() {
            return Err(Error::Provider(format!("knowledge lookup failed: {status}")));
        }

        let page: PageSummary = response.json().await?;
        if page.kind == "disambiguation" {
            return Err(Error::Provider(format!("{topic} is ambiguous")));
        }

        let summary = first_sentences(&page.extract, SUMMARY_SENTENCES);
        if summary.is_empty() {
            return Err(Error::NotFound(format!("article {topic}")));
        }
        Ok(summary)
    }
}

/// First `count` sentences of `text`
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or the end of
/// the text.
#[must_use]
pub fn first_sentences(text: &str, count: usize) -> String {
    let text = text.trim();
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen == count {
                    return text[..idx + c.len_utf8()].to_string();
                }
            }
        }
    }
    text.to_string()
}
