use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use weather_core::{
    Config, TemperatureUnit, WeatherAggregator, WeatherService, client_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Display unit: C or F. Defaults to the configured unit.
    #[arg(long, short, global = true)]
    pub units: Option<TemperatureUnit>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct Place {
    /// City name, e.g. "Paris" or "New York".
    pub city: String,

    /// Optional country/region code, e.g. "FR".
    #[arg(long, short)]
    pub country: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current conditions for a city.
    Current(Place),

    /// Show the 5-day forecast for a city.
    Forecast(Place),

    /// Show current conditions and the 5-day forecast.
    Show {
        /// City name; prompted for when absent.
        city: Option<String>,

        #[arg(long, short)]
        country: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;
        let unit = match self.units {
            Some(unit) => unit,
            None => config.display_unit()?,
        };
        tracing::debug!(
            "Display unit {}, cache window {}s, base URL {}",
            unit,
            config.cache_ttl_secs(),
            config.base_url()
        );

        let client = client_from_config(&config)?;
        let service = WeatherService::new(client, WeatherAggregator::new(unit));

        match self.command {
            Command::Current(place) => {
                show_current(&service, &place.city, place.country.as_deref()).await?;
            }
            Command::Forecast(place) => {
                show_forecast(&service, &place.city, place.country.as_deref()).await?;
            }
            Command::Show { city, country } => {
                let city = match city {
                    Some(city) => city,
                    None => prompt_city()?,
                };
                show_current(&service, &city, country.as_deref()).await?;
                show_forecast(&service, &city, country.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn show_current(
    service: &WeatherService,
    city: &str,
    country: Option<&str>,
) -> anyhow::Result<()> {
    let summary = service
        .current(city, country)
        .await
        .with_context(|| format!("Could not get current weather for '{city}'"))?;
    print!("{}", render::current(&summary));
    Ok(())
}

async fn show_forecast(
    service: &WeatherService,
    city: &str,
    country: Option<&str>,
) -> anyhow::Result<()> {
    let days = service
        .forecast(city, country)
        .await
        .with_context(|| format!("Could not get forecast for '{city}'"))?;
    print!("{}", render::forecast(&days));
    Ok(())
}

fn prompt_city() -> anyhow::Result<String> {
    let city = inquire::Text::new("City name:")
        .with_validator(inquire::required!("Please enter a city"))
        .prompt()
        .context("No city entered")?;
    Ok(city.trim().to_string())
}
