//! `NewsAPI` headlines

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{NewsProvider, http_client, trim_base};
use crate::{Error, Result};

/// Headlines returned per request
const PAGE_SIZE: usize = 3;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
}

/// Client for `NewsAPI` search and top headlines
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    country: String,
}

impl NewsApiClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        country: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
            api_key,
            country: country.into(),
        })
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn headlines(&self, topic: Option<&str>) -> Result<Vec<String>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::NotConfigured("news API key".to_string()))?;

        let page_size = PAGE_SIZE.to_string();
        let request = match topic {
            Some(topic) => self
                .client
                .get(format!("{}/v2/everything", self.base_url))
                .query(&[("q", topic), ("pageSize", page_size.as_str())]),
            None => self
                .client
                .get(format!("{}/v2/top-headlines", self.base_url))
                .query(&[("country", self.country.as_str()), ("pageSize", page_size.as_str())]),
        };

        let response = request
            .query(&[("apiKey", api_key.expose_secret())])
            .send()
            .await?;

        let news: NewsResponse = response.json().await?;
        if news.status != "ok" {
            return Err(Error::Provider(format!("news API status {}", news.status)));
        }

        Ok(news
            .articles
            .into_iter()
            .take(PAGE_SIZE)
            .map(|a| a.title.unwrap_or_else(|| "No title".to_string()))
            .collect())
    }
}
