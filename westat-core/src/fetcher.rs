use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time;

use crate::{Config, model::Report};

pub mod noaa;

pub use noaa::NoaaFetcher;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse report: {0}")]
    Parse(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of weather reports for a station.
///
/// Implementations are called repeatedly from a background task and may be
/// slow or fail; every failure is reported as a [`FetchError`].
#[async_trait]
pub trait ReportFetcher: Send + Sync + Debug {
    async fn fetch(&self, station_id: &str) -> Result<Report, FetchError>;
}

/// Fetch a report, giving up with [`FetchError::Timeout`] after `timeout`.
pub async fn fetch_within(
    fetcher: &dyn ReportFetcher,
    station_id: &str,
    timeout: Duration,
) -> Result<Report, FetchError> {
    match time::timeout(timeout, fetcher.fetch(station_id)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

/// Construct the report fetcher described by `config`.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<NoaaFetcher> {
    NoaaFetcher::new(config.base_url.clone(), config.fetch_timeout())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl ReportFetcher for Stalled {
        async fn fetch(&self, _station_id: &str) -> Result<Report, FetchError> {
            std::future::pending().await
        }
    }

    #[test]
    fn fetcher_from_default_config() {
        let cfg = Config::default();
        let fetcher = fetcher_from_config(&cfg).expect("default fetcher");

        let expected = format!("{}/LFRK.TXT", cfg.base_url);
        assert_eq!(fetcher.report_url("lfrk"), expected);
    }

    #[test]
    fn timeout_error_mentions_duration() {
        let err = FetchError::Timeout(Duration::from_secs(30));
        assert!(err.to_string().contains("30s"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_fetch_times_out() {
        let err = fetch_within(&Stalled, "LFRK", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(err.to_string(), "Fetch timed out after 5s");
    }
}
