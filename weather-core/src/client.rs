use std::{fmt, sync::Arc, time::Duration};

use reqwest::{Client, StatusCode};

use crate::{
    Config,
    cache::{CacheStore, FileCache},
    error::WeatherError,
    model::Fetched,
};

const USER_AGENT: &str = concat!("weather-core/", env!("CARGO_PKG_VERSION"));

/// Units requested upstream. The aggregator converts from here.
const CANONICAL_UNITS: &str = "metric";

/// The two upstream endpoints, which double as cache key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Current,
    Forecast,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::Current => "current",
            FetchKind::Forecast => "forecast",
        }
    }

    /// Path segment under the configured base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            FetchKind::Current => "weather",
            FetchKind::Forecast => "forecast",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{kind}_{location}_{region}` with spaces replaced by `_`.
///
/// No other normalization: "Paris" and "paris" are different keys. A missing
/// region is spelled `none`.
pub fn cache_key(kind: FetchKind, location: &str, region: Option<&str>) -> String {
    format!("{}_{}_{}", kind.as_str(), location, region.unwrap_or("none")).replace(' ', "_")
}

/// Upstream `q` parameter: `city` or `city,region`.
pub fn location_query(location: &str, region: Option<&str>) -> String {
    match region {
        Some(region) => format!("{location},{region}"),
        None => location.to_owned(),
    }
}

/// Cache-first OpenWeather client.
///
/// A cache hit never touches the network. A miss performs one request with a
/// hard timeout; only a successful response is written to the cache.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    api_key: String,
    base_url: String,
    cache: Arc<dyn CacheStore>,
}

impl WeatherClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(WeatherError::Unexpected)?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            cache,
        })
    }

    pub async fn fetch_current(
        &self,
        location: &str,
        region: Option<&str>,
    ) -> Result<Fetched, WeatherError> {
        self.fetch(FetchKind::Current, location, region).await
    }

    pub async fn fetch_forecast(
        &self,
        location: &str,
        region: Option<&str>,
    ) -> Result<Fetched, WeatherError> {
        self.fetch(FetchKind::Forecast, location, region).await
    }

    async fn fetch(
        &self,
        kind: FetchKind,
        location: &str,
        region: Option<&str>,
    ) -> Result<Fetched, WeatherError> {
        let key = cache_key(kind, location, region);

        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("Using cached {} data for '{}' ({}s old)", kind, key, hit.age_secs);
            return Ok(Fetched::cached(hit.payload, hit.age_secs));
        }

        let query = location_query(location, region);
        tracing::info!("Fetching live {} data for '{}'", kind, query);
        let payload = self.request(kind, &query).await?;

        let mut fetched = Fetched::live(payload);
        if let Err(err) = self.cache.put(&key, &fetched.payload).await {
            tracing::warn!("{}", err);
            fetched.cache_warning = Some(err.to_string());
        }

        Ok(fetched)
    }

    async fn request(&self, kind: FetchKind, query: &str) -> Result<serde_json::Value, WeatherError> {
        let url = format!("{}/{}", self.base_url, kind.endpoint());

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("appid", self.api_key.as_str()),
                ("units", CANONICAL_UNITS),
            ])
            .send()
            .await
            .map_err(WeatherError::from_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::from_transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|err| {
                WeatherError::Parse(format!("{kind} response is not valid JSON: {err}"))
            });
        }

        Err(match status {
            StatusCode::UNAUTHORIZED => WeatherError::Auth,
            StatusCode::NOT_FOUND => WeatherError::NotFound { location: query.to_owned() },
            StatusCode::TOO_MANY_REQUESTS => WeatherError::RateLimit,
            other => WeatherError::Upstream { status: other.as_u16(), body: truncate_body(&body) },
        })
    }
}

/// Build a client backed by a [`FileCache`] from configuration.
pub fn client_from_config(config: &Config) -> anyhow::Result<WeatherClient> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: set {} or add `api_key` to {}.",
            crate::config::ENV_API_KEY,
            Config::config_file_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "config.toml".to_string()),
        )
    })?;

    let cache = FileCache::new(config.cache_dir()?, config.cache_ttl_secs());
    let client = WeatherClient::new(api_key, config.base_url(), config.timeout(), Arc::new(cache))?;

    Ok(client)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
