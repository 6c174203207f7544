use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display unit for temperatures. Celsius is the base unit requested upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TemperatureUnit {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "c" | "celsius" | "metric" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" | "imperial" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!("Invalid unit '{value}'. Use 'C' or 'F'.")),
        }
    }
}

/// Upstream weather category (`weather[0].main` in OpenWeather payloads).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Smoke,
    Haze,
    Dust,
    Fog,
    Sand,
    Ash,
    Squall,
    Tornado,
    /// A category this crate has no mapping for; keeps the upstream name.
    Other(String),
}

pub const FALLBACK_ICON: &str = "❓";

impl Condition {
    pub fn from_category(category: &str) -> Self {
        match category {
            "Clear" => Condition::Clear,
            "Clouds" => Condition::Clouds,
            "Rain" => Condition::Rain,
            "Drizzle" => Condition::Drizzle,
            "Thunderstorm" => Condition::Thunderstorm,
            "Snow" => Condition::Snow,
            "Mist" => Condition::Mist,
            "Smoke" => Condition::Smoke,
            "Haze" => Condition::Haze,
            "Dust" => Condition::Dust,
            "Fog" => Condition::Fog,
            "Sand" => Condition::Sand,
            "Ash" => Condition::Ash,
            "Squall" => Condition::Squall,
            "Tornado" => Condition::Tornado,
            other => Condition::Other(other.to_owned()),
        }
    }

    /// Category name as the upstream spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Condition::Clear => "Clear",
            Condition::Clouds => "Clouds",
            Condition::Rain => "Rain",
            Condition::Drizzle => "Drizzle",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Snow => "Snow",
            Condition::Mist => "Mist",
            Condition::Smoke => "Smoke",
            Condition::Haze => "Haze",
            Condition::Dust => "Dust",
            Condition::Fog => "Fog",
            Condition::Sand => "Sand",
            Condition::Ash => "Ash",
            Condition::Squall => "Squall",
            Condition::Tornado => "Tornado",
            Condition::Other(name) => name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Clear => "Clear sky",
            Condition::Clouds => "Cloudy",
            Condition::Rain => "Rain",
            Condition::Drizzle => "Drizzle",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Snow => "Snow",
            Condition::Mist => "Mist",
            Condition::Smoke => "Smoke",
            Condition::Haze => "Haze",
            Condition::Dust => "Dust",
            Condition::Fog => "Fog",
            Condition::Sand => "Sand",
            Condition::Ash => "Volcanic ash",
            Condition::Squall => "Squalls",
            Condition::Tornado => "Tornado",
            Condition::Other(_) => "Unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Condition::Clear => "☀️",
            Condition::Clouds => "☁️",
            Condition::Rain => "🌧️",
            Condition::Drizzle => "🌦️",
            Condition::Thunderstorm => "⛈️",
            Condition::Snow => "❄️",
            Condition::Mist | Condition::Smoke | Condition::Haze | Condition::Fog => "🌫️",
            Condition::Dust | Condition::Sand | Condition::Ash => "💨",
            Condition::Squall => "🌬️",
            Condition::Tornado => "🌪️",
            Condition::Other(_) => FALLBACK_ICON,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Condition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let category = String::deserialize(deserializer)?;
        Ok(Condition::from_category(&category))
    }
}

/// Raw payload as returned by the client, plus its cache age when it was
/// served from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: serde_json::Value,
    pub cache_age: Option<u64>,
    /// Set when a live payload could not be written to the cache.
    pub cache_warning: Option<String>,
}

impl Fetched {
    pub fn live(payload: serde_json::Value) -> Self {
        Self { payload, cache_age: None, cache_warning: None }
    }

    pub fn cached(payload: serde_json::Value, age_secs: u64) -> Self {
        Self { payload, cache_age: Some(age_secs), cache_warning: None }
    }

    pub fn is_cached(&self) -> bool {
        self.cache_age.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWeather {
    pub main: Condition,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawObservationMain {
    pub temp: f64,
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub pressure: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWind {
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSys {
    pub country: Option<String>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Body of the current-conditions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    pub main: RawObservationMain,
    #[serde(default)]
    pub weather: Vec<RawWeather>,
    #[serde(default)]
    pub wind: RawWind,
    pub visibility: Option<f64>,
    #[serde(default)]
    pub sys: RawSys,
    #[serde(default)]
    pub name: String,
    pub dt: Option<i64>,
    /// Seconds east of UTC for the observed location.
    pub timezone: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSlotMain {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
}

/// One 3-hour sample of the forecast endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastSlot {
    pub dt: i64,
    pub main: RawSlotMain,
    #[serde(default)]
    pub weather: Vec<RawWeather>,
}

impl RawForecastSlot {
    pub fn condition(&self) -> Condition {
        self.weather
            .first()
            .map(|w| w.main.clone())
            .unwrap_or_else(|| Condition::Other("Unknown".to_owned()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCity {
    #[serde(default)]
    pub name: String,
    pub country: Option<String>,
    pub timezone: Option<i32>,
}

/// Body of the 5-day / 3-hour forecast endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecast {
    #[serde(default)]
    pub city: RawCity,
    pub list: Vec<RawForecastSlot>,
}

/// Display-ready current conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSummary {
    pub location: String,
    pub last_updated: String,
    pub temperature: i64,
    pub feels_like: i64,
    pub unit: TemperatureUnit,
    pub condition: Condition,
    pub condition_label: String,
    pub icon: &'static str,
    pub humidity_pct: u8,
    pub wind_speed_kmh: i64,
    pub pressure_hpa: u32,
    pub visibility_km: i64,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    /// Seconds since the payload was stored; only set when served from cache.
    pub cache_age: Option<u64>,
}

/// One day of the aggregated forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecastSummary {
    pub date: NaiveDate,
    pub day_label: String,
    pub icon: &'static str,
    pub min: i64,
    pub max: i64,
    pub unit: TemperatureUnit,
    pub condition: Condition,
    pub avg_humidity_pct: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parsing_accepts_letters_and_names() {
        assert_eq!("c".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Celsius);
        assert_eq!(" F ".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!("Imperial".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!("metric".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Celsius);
    }

    #[test]
    fn unit_parsing_rejects_kelvin() {
        let err = "K".parse::<TemperatureUnit>().unwrap_err();
        assert!(err.to_string().contains("Invalid unit"));
    }

    #[test]
    fn known_categories_map_to_icons() {
        assert_eq!(Condition::from_category("Clear"), Condition::Clear);
        assert_eq!(Condition::from_category("Rain").icon(), "🌧️");
        assert_eq!(Condition::from_category("Haze").icon(), Condition::Fog.icon());
    }

    #[test]
    fn unknown_category_falls_back_without_failing() {
        let condition = Condition::from_category("Meteors");

        assert_eq!(condition, Condition::Other("Meteors".into()));
        assert_eq!(condition.as_str(), "Meteors");
        assert_eq!(condition.label(), "Unknown");
        assert_eq!(condition.icon(), FALLBACK_ICON);
    }

    #[test]
    fn categories_are_case_sensitive() {
        assert_eq!(Condition::from_category("clear"), Condition::Other("clear".into()));
    }

    #[test]
    fn slot_without_weather_uses_fallback_condition() {
        let slot: RawForecastSlot = serde_json::from_value(serde_json::json!({
            "dt": 1_700_000_000,
            "main": { "temp": 1.0, "temp_min": 0.0, "temp_max": 2.0, "humidity": 50 }
        }))
        .unwrap();

        assert_eq!(slot.condition().icon(), FALLBACK_ICON);
    }
}
