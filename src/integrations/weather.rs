//! `OpenWeatherMap` current conditions

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{WeatherProvider, WeatherReport, http_client, trim_base};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// Client for the `OpenWeatherMap` current weather endpoint
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl OpenWeatherClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
            api_key,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, city: &str) -> Result<WeatherReport> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::NotConfigured("weather API key".to_string()))?;

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("q", city),
                ("appid", api_key.expose_secret()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("city {city}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "weather API error");
            return Err(Error::Provider(format!("weather API error {status}")));
        }

        let current: CurrentWeather = response.json().await?;
        let description = current
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| Error::Provider("weather response had no conditions".to_string()))?;

        tracing::debug!(city, "weather fetched");
        Ok(WeatherReport {
            description,
            temperature_c: current.main.temp,
        })
    }
}
