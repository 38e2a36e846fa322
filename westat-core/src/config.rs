use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

pub const DEFAULT_STATION: &str = "LFRK";
pub const DEFAULT_BASE_URL: &str = "https://tgftp.nws.noaa.gov/data/observations/metar/decoded";

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ICAO identifier of the reporting station, e.g. "LFRK".
    pub station: String,

    /// Seconds between two report fetches.
    pub refresh_interval_secs: u64,

    /// Seconds between two clock updates.
    pub tick_interval_secs: u64,

    /// Upper bound for a single report fetch.
    pub fetch_timeout_secs: u64,

    /// Directory URL the decoded reports are published under.
    pub base_url: String,

    /// History file; defaults to `weather.json` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,

    /// Diagnostic log; defaults to `westat.log` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            station: DEFAULT_STATION.to_string(),
            refresh_interval_secs: 60,
            tick_interval_secs: 1,
            fetch_timeout_secs: 30,
            base_url: DEFAULT_BASE_URL.to_string(),
            history_file: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(contents)?;
        let station = cfg.station.clone();
        cfg.set_station(&station);
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    pub fn history_file_path(&self) -> Result<PathBuf> {
        match &self.history_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("weather.json")),
        }
    }

    pub fn log_file_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("westat.log")),
        }
    }

    /// Station identifiers are stored upper-case.
    pub fn set_station(&mut self, station: &str) {
        self.station = station.trim().to_uppercase();
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "westat", "westat")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_cadence() {
        let cfg = Config::default();

        assert_eq!(cfg.station, "LFRK");
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(60));
        assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let contents = "station = \"egll\"\nrefresh_interval_secs = 120\n";
        let cfg = Config::from_toml(contents).unwrap();

        assert_eq!(cfg.station, "EGLL");
        assert_eq!(cfg.refresh_interval_secs, 120);
        assert_eq!(cfg.tick_interval_secs, 1);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn explicit_history_file_wins() {
        let contents = "history_file = \"/tmp/h.json\"\n";
        let cfg = Config::from_toml(contents).unwrap();
        let path = cfg.history_file_path().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/h.json"));
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let cfg = Config {
            refresh_interval_secs: 0,
            tick_interval_secs: 0,
            ..Config::default()
        };

        assert_eq!(cfg.refresh_interval(), Duration::from_secs(1));
        assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let contents = "refresh_interval_secs = \"soon\"";
        assert!(Config::from_toml(contents).is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.set_station(" lfrn ");

        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::from_toml(&text).unwrap();

        assert_eq!(parsed.station, "LFRN");
        assert_eq!(parsed.fetch_timeout_secs, cfg.fetch_timeout_secs);
    }
}
