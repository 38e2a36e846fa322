use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use tracing::debug;

use crate::model::{FieldId, FieldValue, Report, ReportSnapshot};

use super::{FetchError, ReportFetcher};

const KMH_PER_MPH: f64 = 1.609_344;
const KM_PER_MILE: f64 = 1.609_344;

/// Fetches decoded METAR reports published by NOAA as plain text.
#[derive(Debug, Clone)]
pub struct NoaaFetcher {
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl NoaaFetcher {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn report_url(&self, station_id: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{}.TXT", station_id.to_uppercase())
    }
}

#[async_trait]
impl ReportFetcher for NoaaFetcher {
    async fn fetch(&self, station_id: &str) -> Result<Report, FetchError> {
        let url = self.report_url(station_id);
        debug!(%url, "fetching report");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "NOAA request for {station_id} failed with status {status}"
            )));
        }

        let body = res.text().await.map_err(|e| self.map_http_error(e))?;

        parse_decoded(station_id, &body)
    }
}

impl NoaaFetcher {
    fn map_http_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Decode a NOAA decoded-METAR text report.
///
/// The station line and the observation time are required. All other fields
/// are decoded independently and fall back to [`FieldValue::Unavailable`].
pub fn parse_decoded(station_id: &str, body: &str) -> Result<Report, FetchError> {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());

    let station_line = lines
        .next()
        .ok_or_else(|| FetchError::Parse(format!("empty report for {station_id}")))?;
    let station_name = station_line
        .split_once(" (")
        .map(|(name, _)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FetchError::Parse(format!("missing station name in {station_line:?}")))?;

    let time_line = lines
        .next()
        .ok_or_else(|| FetchError::Parse(format!("missing observation time for {station_id}")))?;
    let time = parse_observation_time(time_line)?;

    let temperature = celsius(field(body, "Temperature"));
    let wind = field(body, "Wind").map(parse_wind).unwrap_or_default();
    let wind_chill = match (temperature, wind.speed_kmh) {
        (Some(t), Some(v)) => wind_chill(t, v),
        _ => None,
    };
    let dew_point = celsius(field(body, "Dew Point"));
    let pressure = field(body, "Pressure (altimeter)")
        .and_then(|p| paren_number(p, "hPa"));
    let humidity = field(body, "Relative Humidity")
        .and_then(|h| h.trim_end_matches('%').trim().parse::<f64>().ok());
    let visibility = field(body, "Visibility").and_then(visibility_km);

    let numbers = [
        (FieldId::Temperature, temperature, 0),
        (FieldId::DewPoint, dew_point, 0),
        (FieldId::WindChill, wind_chill, 1),
        (FieldId::Pressure, pressure, 0),
        (FieldId::Humidity, humidity, 0),
        (FieldId::WindSpeed, wind.speed_kmh, 0),
        (FieldId::Visibility, visibility, 1),
    ];

    let mut snapshot: ReportSnapshot = numbers
        .into_iter()
        .map(|(id, value, precision)| (id, decoded_number(id, value, precision)))
        .collect();

    let direction = decoded(FieldId::WindDirection, wind.direction);
    let sky = field(body, "Sky conditions").map(String::from);
    let weather = field(body, "Weather").map(String::from);
    snapshot.insert(FieldId::WindDirection, direction);
    snapshot.insert(FieldId::SkyCondition, FieldValue::from(sky));
    snapshot.insert(FieldId::Weather, FieldValue::from(weather));
    snapshot.insert(FieldId::Time, FieldValue::text(time));

    Ok(Report {
        station_id: station_id.to_uppercase(),
        station_name,
        snapshot,
    })
}

fn decoded(id: FieldId, value: Option<String>) -> FieldValue {
    if value.is_none() {
        debug!(field = %id, "field not decoded, marked unavailable");
    }
    FieldValue::from(value)
}

fn decoded_number(id: FieldId, value: Option<f64>, precision: usize) -> FieldValue {
    decoded(id, value.map(|v| format!("{v:.precision$}")))
}

/// `Oct 19, 2026 - 09:30 AM EDT / 2026.10.19 1330 UTC` -> `2026-10-19 13:30:00Z`
fn parse_observation_time(line: &str) -> Result<String, FetchError> {
    let utc = line
        .rsplit_once('/')
        .map(|(_, utc)| utc.trim())
        .and_then(|utc| utc.strip_suffix("UTC"))
        .map(str::trim)
        .ok_or_else(|| FetchError::Parse(format!("missing UTC time in {line:?}")))?;

    let time = NaiveDateTime::parse_from_str(utc, "%Y.%m.%d %H%M")
        .map_err(|e| FetchError::Parse(format!("invalid observation time {utc:?}: {e}")))?;

    Ok(time.format("%Y-%m-%d %H:%M:%SZ").to_string())
}

/// Value of a `Label: value` line, without the trailing `:0` marker.
fn field<'a>(body: &'a str, label: &str) -> Option<&'a str> {
    body.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(label)?.strip_prefix(':')?;
        let value = rest.trim();
        let value = value.strip_suffix(":0").unwrap_or(value).trim();
        (!value.is_empty()).then_some(value)
    })
}

fn celsius(text: Option<&str>) -> Option<f64> {
    text.and_then(|t| paren_number(t, "C"))
}

/// Number inside a `(<number> <unit>)` group, e.g. `(1015 hPa)`.
fn paren_number(text: &str, unit: &str) -> Option<f64> {
    text.split('(').skip(1).find_map(|group| {
        let inner = group.split(')').next()?.trim();
        let number = inner.strip_suffix(unit)?.trim();
        number.parse::<f64>().ok()
    })
}

#[derive(Debug, Default)]
struct Wind {
    direction: Option<String>,
    speed_kmh: Option<f64>,
}

/// `from the WSW (250 degrees) at 9 MPH (8 KT)`, `Calm`, `Variable at 3 MPH (3 KT)`
fn parse_wind(text: &str) -> Wind {
    if text.eq_ignore_ascii_case("calm") {
        return Wind {
            direction: None,
            speed_kmh: Some(0.0),
        };
    }

    let speed_kmh = text
        .split_once(" at ")
        .and_then(|(_, rest)| rest.split_once(" MPH"))
        .and_then(|(mph, _)| mph.trim().parse::<f64>().ok())
        .map(|mph| mph * KMH_PER_MPH);

    let compass = text
        .strip_prefix("from the ")
        .and_then(|rest| rest.split_once(" ("))
        .map(|(compass, _)| compass.trim());
    let degrees = paren_number(text, "degrees");

    let direction = match (degrees, compass) {
        (Some(deg), Some(compass)) => Some(format!("{deg:.0}° ({compass})")),
        _ => None,
    };

    Wind {
        direction,
        speed_kmh,
    }
}

/// `greater than 7 mile(s)`, `1 1/2 mile(s)`, `less than 1/4 mile(s)`
///
/// Words are skipped and the whole and fractional parts are added up.
fn visibility_km(text: &str) -> Option<f64> {
    let (amount, _) = text.split_once(" mile")?;
    let parts: Vec<f64> = amount.split_whitespace().filter_map(miles).collect();

    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().sum::<f64>() * KM_PER_MILE)
}

/// `7`, `1/2`; anything else is not a distance.
fn miles(token: &str) -> Option<f64> {
    match token.split_once('/') {
        Some((num, den)) => {
            let den = den.parse::<f64>().ok().filter(|d| *d != 0.0)?;
            Some(num.parse::<f64>().ok()? / den)
        }
        None => token.parse::<f64>().ok(),
    }
}

/// Wind-chill index in °C; only defined for cold, windy conditions.
fn wind_chill(temp_c: f64, wind_kmh: f64) -> Option<f64> {
    if temp_c > 10.0 || wind_kmh <= 4.8 {
        return None;
    }
    let v = wind_kmh.powf(0.16);
    Some(13.12 + 0.6215 * temp_c - 11.37 * v + 0.3965 * temp_c * v)
}
