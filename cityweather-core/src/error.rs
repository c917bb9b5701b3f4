use reqwest::StatusCode;
use thiserror::Error;

/// Input that cannot become a `WeatherQuery`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("City name must not be blank")]
    BlankCity,
    #[error("Unknown unit system '{0}'. Supported unit systems: metric, imperial.")]
    UnknownUnits(String),
}

/// Failure of a single weather lookup.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    /// The wrapped error never carries the request URL, which holds the API key.
    #[error("Failed to send request to OpenWeather: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("OpenWeather request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to parse OpenWeather JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OpenWeather response contained no weather conditions")]
    NoConditions,
    #[error("OpenWeather reported humidity {0}%, expected 0..=100")]
    HumidityOutOfRange(i64),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::Transport(err.without_url())
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Network(err.into())
    }
}
