//! Field-by-field change between two report snapshots.

use std::{collections::BTreeMap, fmt};

use crate::model::{FieldId, ReportSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaCategory {
    Positive,
    Negative,
    Equal,
}

impl DeltaCategory {
    pub fn glyph(&self) -> &'static str {
        match self {
            DeltaCategory::Positive => "▲",
            DeltaCategory::Negative => "▼",
            DeltaCategory::Equal => "=",
        }
    }
}

/// Signed, categorized change of one field. `magnitude` is always >= 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub category: DeltaCategory,
    pub magnitude: f64,
}

impl Delta {
    pub const EQUAL: Delta = Delta {
        category: DeltaCategory::Equal,
        magnitude: 0.0,
    };

    pub fn between(old: f64, new: f64) -> Self {
        let change = new - old;
        let category = if change > 0.0 {
            DeltaCategory::Positive
        } else if change < 0.0 {
            DeltaCategory::Negative
        } else {
            DeltaCategory::Equal
        };

        Self {
            category,
            magnitude: change.abs(),
        }
    }

    pub fn glyph(&self) -> &'static str {
        self.category.glyph()
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            DeltaCategory::Positive => write!(f, "+{:.1} {}", self.magnitude, self.glyph()),
            DeltaCategory::Negative => write!(f, "-{:.1} {}", self.magnitude, self.glyph()),
            DeltaCategory::Equal => f.write_str(self.glyph()),
        }
    }
}

/// Compare `old` and `new` for each of `fields`.
///
/// A field that is unavailable or non-numeric on either side yields
/// [`Delta::EQUAL`]: a missing value is shown as "no change", never as an error.
pub fn diff(
    old: &ReportSnapshot,
    new: &ReportSnapshot,
    fields: &[FieldId],
) -> BTreeMap<FieldId, Delta> {
    fields
        .iter()
        .map(|&id| {
            let delta = match (old.number(id), new.number(id)) {
                (Some(old), Some(new)) => Delta::between(old, new),
                _ => Delta::EQUAL,
            };
            (id, delta)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    fn temp(value: &str) -> ReportSnapshot {
        ReportSnapshot::new().with(FieldId::Temperature, FieldValue::text(value))
    }

    #[test]
    fn rising_value_is_positive() {
        let deltas = diff(&temp("20"), &temp("23"), &[FieldId::Temperature]);
        let delta = deltas[&FieldId::Temperature];

        assert_eq!(delta.category, DeltaCategory::Positive);
        assert_eq!(delta.magnitude, 3.0);
        assert_eq!(delta.glyph(), "▲");
        assert_eq!(delta.to_string(), "+3.0 ▲");
    }

    #[test]
    fn falling_value_is_negative() {
        let deltas = diff(&temp("23"), &temp("20"), &[FieldId::Temperature]);
        let delta = deltas[&FieldId::Temperature];

        assert_eq!(delta.category, DeltaCategory::Negative);
        assert_eq!(delta.magnitude, 3.0);
        assert_eq!(delta.glyph(), "▼");
        assert_eq!(delta.to_string(), "-3.0 ▼");
    }

    #[test]
    fn unavailable_fields_are_equal() {
        let old = ReportSnapshot::new();
        let new: ReportSnapshot = FieldId::NUMERIC
            .iter()
            .map(|&id| (id, FieldValue::Unavailable))
            .collect();

        let deltas = diff(&old, &new, &FieldId::NUMERIC);

        assert_eq!(deltas.len(), FieldId::NUMERIC.len());
        for delta in deltas.values() {
            assert_eq!(*delta, Delta::EQUAL);
            assert_eq!(delta.to_string(), "=");
        }
    }

    #[test]
    fn one_side_unparsable_is_equal() {
        let deltas = diff(&temp("20"), &temp("warm"), &[FieldId::Temperature]);
        assert_eq!(deltas[&FieldId::Temperature], Delta::EQUAL);

        let deltas = diff(&ReportSnapshot::new(), &temp("20"), &[FieldId::Temperature]);
        assert_eq!(deltas[&FieldId::Temperature], Delta::EQUAL);
    }

    #[test]
    fn only_requested_fields_are_reported() {
        let old = temp("1").with(FieldId::Pressure, FieldValue::text("1010"));
        let new = temp("2").with(FieldId::Pressure, FieldValue::text("1012"));

        let deltas = diff(&old, &new, &[FieldId::Pressure]);

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[&FieldId::Pressure].to_string(), "+2.0 ▲");
    }
}
