use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Identifier of a single field in a weather report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    Temperature,
    DewPoint,
    WindChill,
    Pressure,
    Humidity,
    WindDirection,
    WindSpeed,
    Visibility,
    SkyCondition,
    Weather,
    Time,
}

impl FieldId {
    /// Fields with a numeric value, i.e. the ones a delta is computed for.
    pub const NUMERIC: [FieldId; 7] = [
        FieldId::Temperature,
        FieldId::DewPoint,
        FieldId::WindChill,
        FieldId::Pressure,
        FieldId::Humidity,
        FieldId::WindSpeed,
        FieldId::Visibility,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FieldId::Temperature => "temp",
            FieldId::DewPoint => "dew",
            FieldId::WindChill => "wind_chill",
            FieldId::Pressure => "press",
            FieldId::Humidity => "hum",
            FieldId::WindDirection => "wind_dir",
            FieldId::WindSpeed => "wind_speed",
            FieldId::Visibility => "vis",
            FieldId::SkyCondition => "sky_cond",
            FieldId::Weather => "weather",
            FieldId::Time => "time",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FieldId::Temperature => "Temperature:",
            FieldId::DewPoint => "Dew Point:",
            FieldId::WindChill => "Wind Chill:",
            FieldId::Pressure => "Pressure:",
            FieldId::Humidity => "Humidity:",
            FieldId::WindDirection => "Wind Direction:",
            FieldId::WindSpeed => "Wind Speed:",
            FieldId::Visibility => "Visibility:",
            FieldId::SkyCondition => "Sky Condition:",
            FieldId::Weather => "Weather:",
            FieldId::Time => "Time:",
        }
    }

    pub fn is_numeric(&self) -> bool {
        Self::NUMERIC.contains(self)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A formatted field value, or the "unavailable" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    Text(String),
    #[default]
    Unavailable,
}

impl FieldValue {
    pub const UNAVAILABLE: &'static str = "unavailable";

    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FieldValue::Text(_))
    }

    /// Parse the value as a number. `None` for the sentinel or non-numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            FieldValue::Unavailable => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Unavailable => Self::UNAVAILABLE,
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Unavailable, FieldValue::Text)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full set of formatted values for one fetched report.
///
/// Missing fields read as [`FieldValue::Unavailable`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportSnapshot {
    fields: BTreeMap<FieldId, FieldValue>,
}

impl ReportSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: FieldId, value: FieldValue) -> Self {
        self.fields.insert(id, value);
        self
    }

    pub fn insert(&mut self, id: FieldId, value: FieldValue) {
        self.fields.insert(id, value);
    }

    pub fn get(&self, id: FieldId) -> &FieldValue {
        static UNAVAILABLE: FieldValue = FieldValue::Unavailable;
        self.fields.get(&id).unwrap_or(&UNAVAILABLE)
    }

    pub fn number(&self, id: FieldId) -> Option<f64> {
        self.get(id).as_number()
    }
}

impl FromIterator<(FieldId, FieldValue)> for ReportSnapshot {
    fn from_iter<T: IntoIterator<Item = (FieldId, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// One decoded report for a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub station_id: String,
    pub station_name: String,
    pub snapshot: ReportSnapshot,
}

impl Report {
    /// Timestamp embedded in the report, used to detect a new observation.
    pub fn time(&self) -> &FieldValue {
        self.snapshot.get(FieldId::Time)
    }

    pub fn reading(&self) -> Reading {
        Reading {
            timestamp: self.time().as_str().to_string(),
            temperature: self.snapshot.number(FieldId::Temperature),
            pressure: self.snapshot.number(FieldId::Pressure),
        }
    }
}

/// A persisted history entry. Duplicates are detected by timestamp only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
}

impl Reading {
    pub fn new(
        timestamp: impl Into<String>,
        temperature: Option<f64>,
        pressure: Option<f64>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            temperature,
            pressure,
        }
    }
}

/// Static mapping from field to display unit.
#[derive(Debug, Clone)]
pub struct UnitsTable {
    units: BTreeMap<FieldId, &'static str>,
}

impl UnitsTable {
    pub fn unit(&self, id: FieldId) -> Option<&'static str> {
        self.units.get(&id).copied()
    }

    pub fn without(mut self, id: FieldId) -> Self {
        self.units.remove(&id);
        self
    }
}

impl Default for UnitsTable {
    fn default() -> Self {
        let units = [
            (FieldId::Temperature, "°C"),
            (FieldId::DewPoint, "°C"),
            (FieldId::WindChill, "°C"),
            (FieldId::Pressure, "hPa"),
            (FieldId::Humidity, "%"),
            (FieldId::WindSpeed, "km/h"),
            (FieldId::Visibility, "km"),
        ]
        .into_iter()
        .collect();

        Self { units }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_not_a_number() {
        assert_eq!(FieldValue::Unavailable.as_number(), None);
        assert_eq!(FieldValue::text("n/a").as_number(), None);
        assert_eq!(FieldValue::text(" 12.5 ").as_number(), Some(12.5));
    }

    #[test]
    fn missing_snapshot_field_reads_as_unavailable() {
        let temp = FieldValue::text("20");
        let snapshot = ReportSnapshot::new().with(FieldId::Temperature, temp);

        assert_eq!(snapshot.get(FieldId::Pressure), &FieldValue::Unavailable);
        assert_eq!(snapshot.get(FieldId::Pressure).to_string(), "unavailable");
        assert_eq!(snapshot.number(FieldId::Temperature), Some(20.0));
    }

    #[test]
    fn reading_is_derived_from_report() {
        let report = Report {
            station_id: "LFRK".into(),
            station_name: "Caen".into(),
            snapshot: ReportSnapshot::new()
                .with(FieldId::Time, FieldValue::text("2026-10-19 13:30:00Z"))
                .with(FieldId::Temperature, FieldValue::text("14"))
                .with(FieldId::Pressure, FieldValue::Unavailable),
        };

        let expected = Reading::new("2026-10-19 13:30:00Z", Some(14.0), None);
        assert_eq!(report.reading(), expected);
    }

    #[test]
    fn every_numeric_field_has_a_default_unit() {
        let units = UnitsTable::default();
        for id in FieldId::NUMERIC {
            assert!(units.unit(id).is_some(), "missing unit for {id}");
        }
        assert_eq!(units.unit(FieldId::SkyCondition), None);
    }
}
