//! OpenAI-compatible chat completions for unmatched utterances

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ConversationProvider, http_client, trim_base};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completion client
pub struct OpenAiConversation {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    system_prompt: String,
}

impl OpenAiConversation {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        assistant_name: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
            api_key,
            model: model.into(),
            system_prompt: format!(
                "You are {assistant_name}, a voice assistant. Answer in one or two short spoken sentences."
            ),
        })
    }
}

#[async_trait]
impl ConversationProvider for OpenAiConversation {
    async fn respond(&self, text: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: 150,
        };

        let mut request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "conversation API error");
            return Err(Error::Provider(format!("conversation API error {status}")));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Provider("empty conversation reply".to_string()))
    }
}
