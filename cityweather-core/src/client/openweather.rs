use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::{debug, instrument};

use crate::{
    error::{NetworkError, ParseError, WeatherError},
    model::{WeatherQuery, WeatherResult},
};

use super::WeatherClient;

/// Client for the OpenWeather "current weather" endpoint.
#[derive(Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    endpoint: Url,
    http: Client,
}

impl OpenWeatherClient {
    /// `base_url` is the API root, e.g. `https://api.openweathermap.org/data/2.5`.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = format!("{}/weather", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("Invalid OpenWeather base URL: {base_url}"))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { api_key, endpoint, http })
    }

    pub(crate) fn request_url(&self, query: &WeatherQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query.city())
            .append_pair("appid", &self.api_key)
            .append_pair("units", query.units().as_str());
        url
    }
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip_all, fields(city = %query.city(), units = %query.units()))]
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherResult, WeatherError> {
        debug!(endpoint = %self.endpoint, "requesting current weather");

        let res = self.http.get(self.request_url(query)).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(NetworkError::Status { status, body: truncate_body(&body) }.into());
        }

        let result = parse_current(&body)?;
        debug!(temperature = result.temperature, humidity = result.humidity, "weather received");

        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
}

/// Decode a current-weather body. Only `main.temp`, `main.humidity` and the
/// first `weather` entry are read.
pub(crate) fn parse_current(body: &str) -> Result<WeatherResult, ParseError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;

    let condition = parsed.weather.into_iter().next().ok_or(ParseError::NoConditions)?;

    let humidity = u8::try_from(parsed.main.humidity)
        .ok()
        .filter(|h| *h <= 100)
        .ok_or(ParseError::HumidityOutOfRange(parsed.main.humidity))?;

    Ok(WeatherResult {
        temperature: parsed.main.temp,
        humidity,
        description: condition.description,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
