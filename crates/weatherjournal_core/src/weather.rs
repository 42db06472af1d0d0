//! Boundary with the remote current-weather collaborator.
//!
//! # Responsibility
//! - Define the typed response of `getCurrentWeather` and its source trait.
//! - Convert a response into a storable draft through one explicit function.
//! - Render the human-readable summary separately from the stored values.
//!
//! # Invariants
//! - Stored temperatures are Celsius; responses carry Kelvin.
//! - The display string is output only; nothing parses it back.

use crate::model::entry::NewWeatherEntry;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const KELVIN_OFFSET: f64 = 273.15;

/// `{"name": ..., "main": {"temp": ...}}` as returned by the weather service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    pub main: MainReadings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    /// Kelvin.
    pub temp: f64,
}

#[derive(Debug)]
pub enum WeatherSourceError {
    /// The collaborator could not be reached or answered with a failure.
    Unavailable(String),
    /// The payload did not have the expected shape.
    InvalidPayload(serde_json::Error),
}

impl Display for WeatherSourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "weather source unavailable: {message}"),
            Self::InvalidPayload(err) => write!(f, "invalid weather payload: {err}"),
        }
    }
}

impl Error for WeatherSourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(_) => None,
            Self::InvalidPayload(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for WeatherSourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidPayload(value)
    }
}

/// Read-only access to current conditions for a named location.
///
/// Implemented outside this crate by the HTTP client; retries belong there.
pub trait CurrentWeatherSource {
    fn current_weather(
        &self,
        location: &str,
        api_key: &str,
    ) -> Result<CurrentWeather, WeatherSourceError>;
}

impl CurrentWeather {
    pub fn new(name: impl Into<String>, kelvin: f64) -> Self {
        Self {
            name: name.into(),
            main: MainReadings { temp: kelvin },
        }
    }

    /// Parses a service response body.
    pub fn from_json(body: &str) -> Result<Self, WeatherSourceError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn temperature_kelvin(&self) -> f64 {
        self.main.temp
    }

    pub fn temperature_celsius(&self) -> f64 {
        kelvin_to_celsius(self.main.temp)
    }

    /// Structured draft for insert: location from `name`, Celsius temperature.
    pub fn to_new_entry(&self, notes: Option<String>) -> NewWeatherEntry {
        NewWeatherEntry {
            location: self.name.clone(),
            temperature: self.temperature_celsius(),
            notes,
        }
    }
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Two-line summary shown to the user, e.g. `Location: Kannur\nTemperature: 28.50°C`.
pub fn format_for_display(weather: &CurrentWeather) -> String {
    format!(
        "Location: {}\nTemperature: {:.2}°C",
        weather.name,
        weather.temperature_celsius()
    )
}

#[cfg(test)]
mod tests {
    use super::{format_for_display, kelvin_to_celsius, CurrentWeather, WeatherSourceError};

    #[test]
    fn converts_kelvin_to_celsius() {
        assert!((kelvin_to_celsius(273.15) - 0.0).abs() < 1e-9);
        assert!((kelvin_to_celsius(301.65) - 28.5).abs() < 1e-9);
    }

    #[test]
    fn parses_service_payload_and_ignores_extra_fields() {
        let body = r#"{"name":"Kannur","main":{"temp":301.65,"humidity":70},"cod":200}"#;
        let weather = CurrentWeather::from_json(body).unwrap();
        assert_eq!(weather.name, "Kannur");
        assert!((weather.temperature_kelvin() - 301.65).abs() < 1e-9);
        assert!((weather.temperature_celsius() - 28.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_payload_without_temperature() {
        let err = CurrentWeather::from_json(r#"{"name":"Kannur","main":{}}"#).unwrap_err();
        assert!(matches!(err, WeatherSourceError::InvalidPayload(_)));
    }

    #[test]
    fn draft_keeps_structured_values_and_display_is_separate() {
        let weather = CurrentWeather::new("Kannur", 301.65);
        let draft = weather.to_new_entry(Some("Sunny".to_string()));
        assert_eq!(draft.location, "Kannur");
        assert!((draft.temperature - 28.5).abs() < 1e-9);
        assert_eq!(draft.notes.as_deref(), Some("Sunny"));

        assert_eq!(
            format_for_display(&weather),
            "Location: Kannur\nTemperature: 28.50°C"
        );
    }
}
