//! Display state owned by the render loop.
//!
//! Background workers never mutate this state directly: they send a
//! [`ControllerEvent`] over a channel and the render loop calls
//! [`Controller::handle`] inside its own turn before redrawing.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Local, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    delta::Delta,
    history::HistoryStore,
    model::{FieldId, FieldValue, Report, ReportSnapshot, UnitsTable},
};

pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const LAYOUT: [(&str, &[FieldId]); 2] = [
    (
        "Data",
        &[
            FieldId::Temperature,
            FieldId::DewPoint,
            FieldId::WindChill,
            FieldId::Pressure,
            FieldId::Humidity,
        ],
    ),
    (
        "Weather",
        &[
            FieldId::WindDirection,
            FieldId::WindSpeed,
            FieldId::Visibility,
            FieldId::SkyCondition,
            FieldId::Weather,
        ],
    ),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisplayError {
    #[error("No unit configured for numeric field '{0}'")]
    MissingUnit(FieldId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Report time '{0}' cannot be shown in the header")]
    InvalidTime(String),
}

/// A newly fetched report together with its change against the previous one.
#[derive(Debug, Clone)]
pub struct Update {
    pub report: Report,
    pub deltas: BTreeMap<FieldId, Delta>,
}

/// Mutation requests delivered to the render loop.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Apply(Update),
    Tick(DateTime<Local>),
}

/// The live display element of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    pub id: FieldId,
    pub title: &'static str,
    pub text: String,
    pub delta: Option<Delta>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub bindings: Vec<FieldBinding>,
}

#[derive(Debug)]
pub struct Controller {
    snapshot: ReportSnapshot,
    header: String,
    clock: String,
    sections: Vec<Section>,
    units: UnitsTable,
    history: Arc<HistoryStore>,
}

impl Controller {
    /// Build the display once from the bootstrap report.
    pub fn bootstrap(
        report: &Report,
        units: UnitsTable,
        history: Arc<HistoryStore>,
        now: DateTime<Local>,
    ) -> Self {
        let header = match format_header(&report.station_name, &report.snapshot) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "header unavailable at startup");
                report.station_name.clone()
            }
        };

        let sections = LAYOUT
            .iter()
            .map(|&(title, ids)| Section {
                title,
                bindings: ids
                    .iter()
                    .map(|&id| FieldBinding {
                        id,
                        title: id.title(),
                        text: display_text(&units, id, report.snapshot.get(id)),
                        delta: None,
                    })
                    .collect(),
            })
            .collect();

        Self {
            snapshot: report.snapshot.clone(),
            header,
            clock: now.format(CLOCK_FORMAT).to_string(),
            sections,
            units,
            history,
        }
    }

    pub fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Apply(update) => self.apply(update),
            ControllerEvent::Tick(now) => self.tick(now),
        }
    }

    /// Show a new report: every bound field gets its value and delta, and the
    /// header is refreshed. A field that cannot be formatted is logged and
    /// shown as its bare value.
    pub fn apply(&mut self, update: Update) {
        let Update { report, deltas } = update;

        let bindings = self.sections.iter_mut().flat_map(|s| &mut s.bindings);
        for binding in bindings {
            let value = report.snapshot.get(binding.id);
            binding.text = match format_field(&self.units, binding.id, value) {
                Ok(text) => text,
                Err(e) => {
                    warn!(field = %binding.id, error = %e, "field shown without unit");
                    value.to_string()
                }
            };
            binding.delta = deltas.get(&binding.id).copied();
        }

        match format_header(&report.station_name, &report.snapshot) {
            Ok(header) => self.header = header,
            Err(e) => warn!(error = %e, header = %self.header, "keeping previous header"),
        }

        self.snapshot = report.snapshot;
        debug!(header = %self.header, clock = %self.clock, "report applied");
    }

    /// Replace the clock line only.
    pub fn tick(&mut self, now: DateTime<Local>) {
        self.clock = now.format(CLOCK_FORMAT).to_string();
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn clock(&self) -> &str {
        &self.clock
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn snapshot(&self) -> &ReportSnapshot {
        &self.snapshot
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn binding(&self, id: FieldId) -> Option<&FieldBinding> {
        self.sections
            .iter()
            .flat_map(|s| s.bindings.iter())
            .find(|b| b.id == id)
    }
}

/// `value unit`, or the bare value for fields without a unit.
pub fn format_field(
    units: &UnitsTable,
    id: FieldId,
    value: &FieldValue,
) -> Result<String, DisplayError> {
    if !value.is_available() {
        return Ok(value.to_string());
    }

    match units.unit(id) {
        Some(unit) => Ok(format!("{value} {unit}")),
        None if id.is_numeric() => Err(DisplayError::MissingUnit(id)),
        None => Ok(value.to_string()),
    }
}

/// `Station name (HH:MM)` using the report's observation time.
pub fn format_header(station_name: &str, snapshot: &ReportSnapshot) -> Result<String, HeaderError> {
    let time = snapshot.get(FieldId::Time);
    let parsed = NaiveDateTime::parse_from_str(time.as_str(), "%Y-%m-%d %H:%M:%SZ")
        .map_err(|_| HeaderError::InvalidTime(time.to_string()))?;

    Ok(format!("{station_name} ({})", parsed.format("%H:%M")))
}

fn display_text(units: &UnitsTable, id: FieldId, value: &FieldValue) -> String {
    match format_field(units, id, value) {
        Ok(text) => text,
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{self, DeltaCategory};
    use chrono::TimeZone;

    fn report(time: &str, temp: &str, press: &str) -> Report {
        Report {
            station_id: "LFRK".into(),
            station_name: "Caen".into(),
            snapshot: ReportSnapshot::new()
                .with(FieldId::Time, FieldValue::text(time))
                .with(FieldId::Temperature, FieldValue::text(temp))
                .with(FieldId::Pressure, FieldValue::text(press))
                .with(FieldId::SkyCondition, FieldValue::text("clear")),
        }
    }

    fn controller(initial: &Report) -> (Controller, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryStore::load(dir.path().join("weather.json")));
        let now = Local.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
        let ctl = Controller::bootstrap(initial, UnitsTable::default(), history, now);
        (ctl, dir)
    }

    fn update(old: &Report, new: &Report) -> Update {
        Update {
            report: new.clone(),
            deltas: delta::diff(&old.snapshot, &new.snapshot, &FieldId::NUMERIC),
        }
    }

    #[test]
    fn bootstrap_builds_bindings_in_display_order() {
        let initial = report("2026-10-19 13:00:00Z", "14", "1015");
        let (ctl, _dir) = controller(&initial);

        let titles: Vec<_> = ctl.sections().iter().map(|s| s.title).collect();
        assert_eq!(titles, ["Data", "Weather"]);
        assert_eq!(ctl.sections()[0].bindings[0].id, FieldId::Temperature);
        assert_eq!(ctl.sections()[1].bindings.len(), 5);

        assert_eq!(ctl.header(), "Caen (13:00)");
        assert_eq!(ctl.clock(), "2026-10-19 15:00:00");
        assert_eq!(ctl.binding(FieldId::Temperature).unwrap().text, "14 °C");
        assert_eq!(ctl.binding(FieldId::DewPoint).unwrap().text, "unavailable");
        assert_eq!(ctl.binding(FieldId::SkyCondition).unwrap().text, "clear");
        assert!(ctl.binding(FieldId::Temperature).unwrap().delta.is_none());
    }

    #[test]
    fn apply_sets_values_deltas_and_header() {
        let initial = report("2026-10-19 13:00:00Z", "14", "1015");
        let next = report("2026-10-19 13:30:00Z", "16", "1013");
        let (mut ctl, _dir) = controller(&initial);

        ctl.apply(update(&initial, &next));

        let temp = ctl.binding(FieldId::Temperature).unwrap();
        assert_eq!(temp.text, "16 °C");
        assert_eq!(temp.delta.unwrap().category, DeltaCategory::Positive);

        let press = ctl.binding(FieldId::Pressure).unwrap();
        assert_eq!(press.text, "1013 hPa");
        assert_eq!(press.delta.unwrap().to_string(), "-2.0 ▼");

        assert_eq!(ctl.header(), "Caen (13:30)");
        assert_eq!(ctl.snapshot(), &next.snapshot);
    }

    #[test]
    fn apply_twice_is_idempotent() {
        let initial = report("2026-10-19 13:00:00Z", "14", "1015");
        let next = report("2026-10-19 13:30:00Z", "12", "1015");
        let (mut ctl, _dir) = controller(&initial);

        let upd = update(&initial, &next);
        ctl.apply(upd.clone());
        let first: Vec<Section> = ctl.sections().to_vec();
        let header = ctl.header().to_string();

        ctl.apply(upd);
        assert_eq!(ctl.sections(), first.as_slice());
        assert_eq!(ctl.header(), header);
    }

    #[test]
    fn invalid_report_time_keeps_previous_header() {
        let initial = report("2026-10-19 13:00:00Z", "14", "1015");
        let mut broken = report("garbage", "15", "1015");
        broken.station_name = "Elsewhere".into();
        let (mut ctl, _dir) = controller(&initial);

        ctl.apply(update(&initial, &broken));

        assert_eq!(ctl.header(), "Caen (13:00)");
        assert_eq!(ctl.binding(FieldId::Temperature).unwrap().text, "15 °C");
    }

    #[test]
    fn missing_unit_falls_back_to_bare_value() {
        let initial = report("2026-10-19 13:00:00Z", "14", "1015");
        let next = report("2026-10-19 13:30:00Z", "13", "1012");
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryStore::load(dir.path().join("weather.json")));
        let units = UnitsTable::default().without(FieldId::Pressure);
        let mut ctl = Controller::bootstrap(&initial, units, history, Local::now());

        ctl.apply(update(&initial, &next));

        let press = ctl.binding(FieldId::Pressure).unwrap();
        assert_eq!(press.text, "1012");
        assert_eq!(press.delta.unwrap().to_string(), "-3.0 ▼");
        assert_eq!(ctl.binding(FieldId::Temperature).unwrap().text, "13 °C");
        assert_eq!(ctl.header(), "Caen (13:30)");
    }

    #[test]
    fn numeric_field_without_unit_is_an_error() {
        let units = UnitsTable::default().without(FieldId::Pressure);
        let value = FieldValue::text("1015");

        let err = format_field(&units, FieldId::Pressure, &value).unwrap_err();
        assert_eq!(err, DisplayError::MissingUnit(FieldId::Pressure));

        let sky = FieldValue::text("clear");
        let text = format_field(&units, FieldId::SkyCondition, &sky).unwrap();
        assert_eq!(text, "clear");
    }

    #[test]
    fn tick_replaces_only_the_clock() {
        let initial = report("2026-10-19 13:00:00Z", "14", "1015");
        let (mut ctl, _dir) = controller(&initial);
        let sections = ctl.sections().to_vec();

        let later = Local.with_ymd_and_hms(2026, 10, 19, 15, 0, 1).unwrap();
        ctl.handle(ControllerEvent::Tick(later));

        assert_eq!(ctl.clock(), "2026-10-19 15:00:01");
        assert_eq!(ctl.header(), "Caen (13:00)");
        assert_eq!(ctl.sections(), sections.as_slice());
    }

    #[test]
    fn header_requires_a_valid_time() {
        let snapshot = ReportSnapshot::new();
        assert_eq!(
            format_header("Caen", &snapshot),
            Err(HeaderError::InvalidTime("unavailable".into()))
        );
    }
}
