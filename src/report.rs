use std::fmt;
use std::io;

use serde::Serialize;

use crate::significance::{format_with_uncertainty, Rounded};
use crate::{Error, Result};

/// A reported quantity: value, expanded uncertainty, the coverage factor used and the unit
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportEntry {
    pub(crate) name: String,
    pub(crate) value: f64,
    pub(crate) uncertainty: f64,
    pub(crate) coverage_factor: f64,
    pub(crate) unit: String,
}

impl ReportEntry {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        uncertainty: f64,
        coverage_factor: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            uncertainty,
            coverage_factor,
            unit: unit.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Expanded uncertainty, the standard uncertainty times [`ReportEntry::coverage_factor`]
    pub const fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    pub const fn coverage_factor(&self) -> f64 {
        self.coverage_factor
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn rounded(&self) -> Rounded {
        format_with_uncertainty(self.value, self.uncertainty)
    }

    /// `U / |value|`, or `None` for a zero value
    pub fn relative_uncertainty(&self) -> Option<f64> {
        if self.value == 0.0 {
            None
        } else {
            Some(self.uncertainty / self.value.abs())
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ({})", self.name, self.rounded())?;
        if !self.unit.is_empty() {
            write!(f, " {}", self.unit)?;
        }
        write!(f, " (k={})", self.coverage_factor)
    }
}

/// Relative deviation `|measured - reference| / |reference|` of a result from a reference value
///
/// # Errors
/// Returns [`Error::UndefinedResult`] if `reference` is zero or either number is not finite.
pub fn relative_deviation(measured: f64, reference: f64) -> Result<f64> {
    if reference == 0.0 {
        return Err(Error::undefined("deviation from a zero reference value"));
    }
    let deviation = (measured - reference).abs() / reference.abs();
    if deviation.is_finite() {
        Ok(deviation)
    } else {
        Err(Error::undefined("deviation is not finite"))
    }
}

#[derive(Serialize)]
struct Row<'a> {
    name: &'a str,
    value: f64,
    uncertainty: f64,
    coverage_factor: f64,
    unit: &'a str,
    reported_value: f64,
    reported_uncertainty: f64,
    decimals: i32,
}

/// Write `entries` as CSV with a header row
///
/// Each row carries the full-precision value and uncertainty alongside the rounded pair and its
/// decimal count.
///
/// # Errors
/// Returns an error if serialisation or the underlying writer fails.
pub fn write_csv<W: io::Write>(entries: &[ReportEntry], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        let rounded = entry.rounded();
        wtr.serialize(Row {
            name: &entry.name,
            value: entry.value,
            uncertainty: entry.uncertainty,
            coverage_factor: entry.coverage_factor,
            unit: &entry.unit,
            reported_value: rounded.value(),
            reported_uncertainty: rounded.uncertainty(),
            decimals: rounded.decimals(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{relative_deviation, write_csv, ReportEntry};
    use crate::Error;

    #[test]
    fn entries_display_rounded_values_with_unit_and_coverage_factor() {
        let entry = ReportEntry::new("rho", 2.0312, 0.0283, 1.0, "g/cm³");
        assert_eq!(entry.to_string(), "rho = (2.03 ± 0.03) g/cm³ (k=1)");

        let entry = ReportEntry::new("m", 35.75, 0.047_487, 1.645, "g");
        assert_eq!(entry.to_string(), "m = (35.75 ± 0.05) g (k=1.645)");

        let entry = ReportEntry::new("gamma", 1.3921, 0.0123, 1.0, "");
        assert_eq!(entry.to_string(), "gamma = (1.392 ± 0.012) (k=1)");
    }

    #[test]
    fn relative_uncertainty_is_undefined_for_zero_values() {
        let entry = ReportEntry::new("x", -4.0, 0.2, 1.0, "mm");
        approx::assert_relative_eq!(entry.relative_uncertainty().unwrap(), 0.05);
        assert!(ReportEntry::new("x", 0.0, 0.2, 1.0, "mm")
            .relative_uncertainty()
            .is_none());
    }

    #[test]
    fn deviation_from_reference_is_relative_to_the_reference() {
        approx::assert_relative_eq!(relative_deviation(1.33, 1.4).unwrap(), 0.05, max_relative = 1e-12);
        assert!(matches!(
            relative_deviation(1.33, 0.0),
            Err(Error::UndefinedResult(_))
        ));
    }

    #[test]
    fn csv_export_has_a_header_and_one_row_per_entry() {
        let entries = vec![
            ReportEntry::new("D1", 2.2636, 0.0016, 1.0, "mm"),
            ReportEntry::new("R", 855.32, 2.83, 1.0, "mm"),
        ];
        let mut buffer = vec![];

        write_csv(&entries, &mut buffer).unwrap();

        let written = String::from_utf8(buffer).unwrap();
        let lines = written.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "name,value,uncertainty,coverage_factor,unit,reported_value,reported_uncertainty,decimals"
        );
        assert_eq!(lines[1], "D1,2.2636,0.0016,1.0,mm,2.2636,0.0016,4");
        assert_eq!(lines[2], "R,855.32,2.83,1.0,mm,855.0,3.0,0");
        assert_eq!(lines.len(), 3);
    }
}
