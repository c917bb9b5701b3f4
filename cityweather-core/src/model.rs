use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::QueryError;

/// Temperature convention passed through to the provider unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Degrees Celsius.
    #[default]
    Metric,
    /// Degrees Fahrenheit.
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    /// Suffix for rendered temperatures, e.g. `C` in `21.5°C`.
    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "C",
            UnitSystem::Imperial => "F",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Metric, UnitSystem::Imperial]
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = QueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            _ => Err(QueryError::UnknownUnits(value.to_string())),
        }
    }
}

impl FromStr for UnitSystem {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitSystem::try_from(s)
    }
}

/// A validated lookup: a non-blank city and the unit system to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    city: String,
    units: UnitSystem,
}

impl WeatherQuery {
    pub fn new(city: impl AsRef<str>, units: UnitSystem) -> Result<Self, QueryError> {
        let city = city.as_ref().trim();
        if city.is_empty() {
            return Err(QueryError::BlankCity);
        }

        Ok(Self { city: city.to_string(), units })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }
}

/// Current conditions for one city, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub temperature: f64,
    pub humidity: u8,
    pub description: String,
}
