use std::{io, path::PathBuf};

use thiserror::Error;

/// Every failure the weather pipeline can report to its caller.
///
/// Network-classified variants come from [`crate::WeatherClient`]; `Parse` comes
/// from a payload the aggregator could not interpret; `CacheWrite` is produced
/// by cache stores and only ever logged by the client.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Invalid API key. Check the configured OpenWeather credential.")]
    Auth,

    #[error("Location not found: {location}")]
    NotFound { location: String },

    #[error("API rate limit exceeded")]
    RateLimit,

    #[error("Weather request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Weather request timed out")]
    Timeout,

    #[error("Network connection error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Unexpected error during weather request: {0}")]
    Unexpected(#[source] reqwest::Error),

    #[error("Failed to interpret weather response: {0}")]
    Parse(String),

    #[error("Failed to write cache entry '{key}' at {}: {source}", path.display())]
    CacheWrite {
        key: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WeatherError {
    /// True for failures that mean the upstream could not be reached or refused
    /// the request, as opposed to returning something uninterpretable.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            WeatherError::Auth
                | WeatherError::NotFound { .. }
                | WeatherError::RateLimit
                | WeatherError::Upstream { .. }
                | WeatherError::Timeout
                | WeatherError::Network(_)
                | WeatherError::Unexpected(_)
        )
    }

    /// Classify a transport-level reqwest failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout
        } else if err.is_connect() {
            WeatherError::Network(err)
        } else {
            WeatherError::Unexpected(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_not_a_network_error() {
        assert!(!WeatherError::Parse("missing main".into()).is_network());
        assert!(WeatherError::RateLimit.is_network());
        assert!(WeatherError::Upstream { status: 503, body: String::new() }.is_network());
    }

    #[test]
    fn messages_mention_the_failing_detail() {
        let err = WeatherError::NotFound { location: "Atlantis".into() };
        assert!(err.to_string().contains("Atlantis"));

        let err = WeatherError::Upstream { status: 502, body: "bad gateway".into() };
        assert!(err.to_string().contains("502"));
    }
}
