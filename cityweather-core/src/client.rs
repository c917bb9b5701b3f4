use crate::{
    Config, WeatherQuery, WeatherResult, client::openweather::OpenWeatherClient,
    error::WeatherError,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// One live lookup of current conditions. Implementations must not cache.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherResult, WeatherError>;
}

/// Construct the OpenWeather client from config. Call once at startup and
/// share the returned handle.
pub fn client_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherClient>> {
    let client = OpenWeatherClient::new(
        config.api_key()?.to_owned(),
        config.base_url().to_owned(),
        config.timeout(),
    )?;

    Ok(Arc::new(client))
}
