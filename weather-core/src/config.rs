use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{cache::DEFAULT_VALIDITY_SECS, model::TemperatureUnit};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_BASE_URL: &str = "WEATHER_BASE_URL";
pub const ENV_CACHE_TTL: &str = "WEATHER_CACHE_TTL_SECS";
pub const ENV_UNITS: &str = "WEATHER_UNITS";
pub const ENV_CACHE_DIR: &str = "WEATHER_CACHE_DIR";
pub const ENV_TIMEOUT: &str = "WEATHER_TIMEOUT_SECS";

/// Settings read from `config.toml` and the environment. Never written back.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "F"
/// cache_ttl_secs = 600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    /// "C"/"F" or "celsius"/"fahrenheit".
    pub units: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.display_unit()?;
        if cfg.timeout_secs == Some(0) {
            return Err(anyhow!("timeout_secs must be a number of seconds > 0"));
        }
        Ok(cfg)
    }

    /// Overlay values found through `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(ttl) = get(ENV_CACHE_TTL) {
            let secs = ttl
                .parse::<u64>()
                .with_context(|| format!("{ENV_CACHE_TTL} must be a whole number of seconds"))?;
            self.cache_ttl_secs = Some(secs);
        }
        if let Some(units) = get(ENV_UNITS) {
            units.parse::<TemperatureUnit>().with_context(|| format!("Invalid {ENV_UNITS}"))?;
            self.units = Some(units);
        }
        if let Some(dir) = get(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            let secs = timeout
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow!("{ENV_TIMEOUT} must be a number of seconds > 0"))?;
            self.timeout_secs = Some(secs);
        }

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// API key, if configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.cache_ttl_secs.unwrap_or(DEFAULT_VALIDITY_SECS)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn display_unit(&self) -> Result<TemperatureUnit> {
        match self.units.as_deref() {
            Some(units) => units.parse(),
            None => Ok(TemperatureUnit::default()),
        }
    }

    /// Configured cache directory, or the platform cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().join("responses")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let cfg = Config::default();

        assert_eq!(cfg.api_key(), None);
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.cache_ttl_secs(), 900);
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.display_unit().unwrap(), TemperatureUnit::Celsius);
    }

    #[test]
    fn parses_toml_file_contents() {
        let cfg = Config::from_toml(
            r#"
            api_key = "FILE_KEY"
            units = "F"
            cache_ttl_secs = 600
            cache_dir = "/var/cache/weather"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
        assert_eq!(cfg.display_unit().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!(cfg.cache_ttl_secs(), 600);
        assert_eq!(cfg.cache_dir().unwrap(), PathBuf::from("/var/cache/weather"));
    }

    #[test]
    fn invalid_unit_in_toml_is_rejected() {
        let err = Config::from_toml(r#"units = "kelvin""#).unwrap_err();
        assert!(err.to_string().contains("Invalid unit"));
    }

    #[test]
    fn invalid_timeout_in_toml_is_rejected() {
        let err = Config::from_toml("timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));

        let cfg = Config::from_toml("timeout_secs = 4").unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(4));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut cfg = Config::from_toml(r#"api_key = "FILE_KEY""#).unwrap();

        cfg.apply_overrides(env(&[
            (ENV_API_KEY, "ENV_KEY"),
            (ENV_BASE_URL, "http://localhost:9999"),
            (ENV_CACHE_TTL, "60"),
            (ENV_UNITS, "fahrenheit"),
            (ENV_TIMEOUT, "3"),
        ]))
        .unwrap();

        assert_eq!(cfg.api_key(), Some("ENV_KEY"));
        assert_eq!(cfg.base_url(), "http://localhost:9999");
        assert_eq!(cfg.cache_ttl_secs(), 60);
        assert_eq!(cfg.display_unit().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let mut cfg = Config::from_toml(r#"api_key = "FILE_KEY""#).unwrap();

        cfg.apply_overrides(env(&[(ENV_API_KEY, "   ")])).unwrap();

        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
    }

    #[test]
    fn bad_ttl_is_an_error() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[(ENV_CACHE_TTL, "soon")])).unwrap_err();

        assert!(err.to_string().contains(ENV_CACHE_TTL));
    }

    #[test]
    fn zero_timeout_is_an_error() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[(ENV_TIMEOUT, "0")])).unwrap_err();

        assert!(err.to_string().contains(ENV_TIMEOUT));
    }
}
