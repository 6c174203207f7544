use crate::{
    aggregator::WeatherAggregator,
    client::WeatherClient,
    error::WeatherError,
    model::{CurrentSummary, DailyForecastSummary, TemperatureUnit},
};

/// Fetch-then-aggregate in one call, with typed errors on both halves.
#[derive(Debug, Clone)]
pub struct WeatherService {
    client: WeatherClient,
    aggregator: WeatherAggregator,
}

impl WeatherService {
    pub fn new(client: WeatherClient, aggregator: WeatherAggregator) -> Self {
        Self { client, aggregator }
    }

    /// Takes effect on the next call; cached payloads are re-aggregated in the
    /// new unit without a network request.
    pub fn set_unit(&mut self, unit: TemperatureUnit) {
        self.aggregator.set_unit(unit);
    }

    pub async fn current(
        &self,
        location: &str,
        region: Option<&str>,
    ) -> Result<CurrentSummary, WeatherError> {
        let fetched = self.client.fetch_current(location, region).await?;
        self.aggregator.parse_current(&fetched).ok_or_else(|| {
            WeatherError::Parse(format!("current weather for '{location}' has no temperature data"))
        })
    }

    pub async fn forecast(
        &self,
        location: &str,
        region: Option<&str>,
    ) -> Result<Vec<DailyForecastSummary>, WeatherError> {
        let fetched = self.client.fetch_forecast(location, region).await?;
        self.aggregator.parse_forecast(&fetched).ok_or_else(|| {
            WeatherError::Parse(format!("forecast for '{location}' has no usable slots"))
        })
    }
}
