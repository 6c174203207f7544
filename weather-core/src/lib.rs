//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration read from `config.toml` and the environment
//! - A fail-open cache store for raw responses
//! - A cache-first OpenWeather client with typed failures
//! - Aggregation of raw payloads into current and 5-day summaries
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod service;

pub use aggregator::WeatherAggregator;
pub use cache::{CacheHit, CacheStore, FileCache, MemoryCache};
pub use client::{FetchKind, WeatherClient, cache_key, client_from_config};
pub use config::Config;
pub use error::WeatherError;
pub use model::{Condition, CurrentSummary, DailyForecastSummary, Fetched, TemperatureUnit};
pub use service::WeatherService;
