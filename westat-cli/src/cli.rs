use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use westat_core::{Config, HistoryStore, Reading};

use crate::{app, logging};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "westat", version, about = "Terminal weather station display")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Choose the station and refresh interval, and save them.
    Configure,

    /// Show the live report (default).
    Watch {
        /// Station identifier, e.g. "LFRK".
        #[arg(long)]
        station: Option<String>,

        /// Seconds between two report fetches.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Print the stored readings.
    History {
        /// Number of most recent readings to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        let command = self.command.unwrap_or(Command::Watch {
            station: None,
            interval: None,
        });

        match command {
            Command::Configure => configure(&mut config)?,
            Command::Watch { station, interval } => {
                if let Some(station) = station {
                    config.set_station(&station);
                }
                if let Some(interval) = interval {
                    config.refresh_interval_secs = interval;
                }

                let _guard = match logging::init(&config) {
                    Ok(guard) => Some(guard),
                    Err(e) => {
                        eprintln!("westat: file logging disabled: {e:#}");
                        None
                    }
                };

                app::run(config).await?;
            }
            Command::History { limit } => {
                let store = HistoryStore::load(config.history_file_path()?);
                print_history(&store.readings(), limit);
            }
        }

        Ok(())
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let station = Text::new("Station identifier:")
        .with_default(&config.station)
        .with_help_message("ICAO code of the reporting station, e.g. LFRK")
        .prompt()
        .context("Station prompt cancelled")?;

    let interval = CustomType::<u64>::new("Refresh interval (seconds):")
        .with_default(config.refresh_interval_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()
        .context("Interval prompt cancelled")?;

    config.set_station(&station);
    config.refresh_interval_secs = interval;
    config.save()?;

    let path = Config::config_file_path()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_history(readings: &[Reading], limit: usize) {
    if readings.is_empty() {
        println!("No readings stored yet.");
        return;
    }

    println!("{}", row("time", "temp (°C)", "pressure (hPa)"));
    let start = readings.len().saturating_sub(limit);
    for r in &readings[start..] {
        let (temp, pressure) = (optional(r.temperature), optional(r.pressure));
        let line = row(&r.timestamp, &temp, &pressure);
        println!("{line}");
    }
}

fn row(time: &str, temp: &str, pressure: &str) -> String {
    format!("{time:<22} {temp:>10} {pressure:>15}")
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_watch() {
        let cli = Cli::try_parse_from(["westat"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn watch_accepts_overrides() {
        let args = ["westat", "watch", "--station", "egll", "--interval", "120"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Command::Watch { station, interval }) => {
                assert_eq!(station.as_deref(), Some("egll"));
                assert_eq!(interval, Some(120));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_values_print_as_dash() {
        assert_eq!(optional(None), "-");
        assert_eq!(optional(Some(1015.0)), "1015");
    }

    #[test]
    fn history_rows_line_up_with_the_header() {
        let header = row("time", "temp (°C)", "pressure (hPa)");
        let line = row("2026-10-19 13:30:00Z", "14", "-");

        assert_eq!(header.chars().count(), line.chars().count());
        assert!(line.starts_with("2026-10-19 13:30:00Z   "));
        assert!(line.ends_with(" -"));
    }
}
