use std::collections::HashMap;

use tracing::debug;

use crate::config::ExperimentConfig;
use crate::instrument::{type_b, Reading};
use crate::margin::Measurement;
use crate::propagation::{evaluate, Formula};
use crate::report::ReportEntry;
use crate::statistics::{estimate, Summary};
use crate::uncertainty::{combine_estimates, CoverageFactor, Estimate};
use crate::{Error, Result};

/// A directly measured quantity: repeated readings on one instrument
#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredQuantity {
    name: String,
    unit: String,
    readings: Vec<f64>,
    limit: f64,
    reading: Reading,
    coverage_factor: CoverageFactor<f64>,
}

impl MeasuredQuantity {
    pub fn new(name: impl Into<String>, readings: Vec<f64>, limit: f64) -> Self {
        Self {
            name: name.into(),
            unit: String::new(),
            readings,
            limit,
            reading: Reading::Direct,
            coverage_factor: CoverageFactor::standard(),
        }
    }

    /// A quantity read as the difference `|b - a|` of each pair of scale readings
    pub fn from_pairs(name: impl Into<String>, pairs: &[[f64; 2]], limit: f64) -> Self {
        let readings = pairs.iter().map(|[a, b]| (b - a).abs()).collect();
        Self::new(name, readings, limit).with_reading(Reading::Difference)
    }

    #[must_use]
    pub const fn with_reading(mut self, reading: Reading) -> Self {
        self.reading = reading;
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// # Errors
    /// Returns [`Error::InvalidInput`] if `k` is below one or not finite.
    pub fn with_coverage_factor(mut self, k: f64) -> Result<Self> {
        self.coverage_factor = CoverageFactor::new(k)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    pub const fn limit(&self) -> f64 {
        self.limit
    }

    pub const fn reading(&self) -> Reading {
        self.reading
    }

    pub const fn coverage_factor(&self) -> CoverageFactor<f64> {
        self.coverage_factor
    }

    /// Summarise the readings and combine their Type-A and Type-B uncertainties
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if there are no readings, a reading is not finite, or the
    /// instrument limit is negative or not finite.
    pub fn summarize(&self) -> Result<QuantitySummary> {
        let statistics = estimate(&self.readings)?;
        let type_a = Estimate::type_a(statistics.type_a())?;
        let type_b = Estimate::type_b(type_b(self.limit, self.reading)?)?;
        let combined = combine_estimates(type_a, type_b)?;

        debug!(
            quantity = %self.name,
            count = statistics.count(),
            mean = statistics.mean(),
            u_a = type_a.standard_uncertainty(),
            u_b = type_b.standard_uncertainty(),
            u_c = combined.standard_uncertainty(),
            "summarised measured quantity"
        );

        Ok(QuantitySummary {
            name: self.name.clone(),
            unit: self.unit.clone(),
            statistics,
            type_a,
            type_b,
            combined,
            coverage_factor: self.coverage_factor,
        })
    }
}

/// Statistics and uncertainty budget of one measured quantity
#[derive(Clone, Debug, PartialEq)]
pub struct QuantitySummary {
    name: String,
    unit: String,
    statistics: Summary<f64>,
    type_a: Estimate<f64>,
    type_b: Estimate<f64>,
    combined: Estimate<f64>,
    coverage_factor: CoverageFactor<f64>,
}

impl QuantitySummary {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn statistics(&self) -> &Summary<f64> {
        &self.statistics
    }

    pub const fn type_a(&self) -> Estimate<f64> {
        self.type_a
    }

    pub const fn type_b(&self) -> Estimate<f64> {
        self.type_b
    }

    pub const fn combined(&self) -> Estimate<f64> {
        self.combined
    }

    /// The mean with its combined standard uncertainty
    pub const fn measurement(&self) -> Measurement<f64> {
        Measurement {
            value: self.statistics.mean,
            uncertainty: self.combined.standard_uncertainty,
        }
    }

    pub fn expanded(&self) -> f64 {
        self.coverage_factor.expand(self.combined.standard_uncertainty)
    }

    pub fn report(&self) -> ReportEntry {
        ReportEntry::new(
            &self.name,
            self.statistics.mean,
            self.expanded(),
            self.coverage_factor.get(),
            &self.unit,
        )
    }
}

/// A quantity computed from named inputs through a formula
///
/// The inputs are passed to the formula in the order they are listed.
pub struct DerivedQuantity<F> {
    name: String,
    unit: String,
    inputs: Vec<String>,
    coverage_factor: CoverageFactor<f64>,
    formula: F,
}

impl<F: Formula<f64>> DerivedQuantity<F> {
    pub fn new<I, S>(name: impl Into<String>, inputs: I, formula: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            unit: String::new(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            coverage_factor: CoverageFactor::standard(),
            formula,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// # Errors
    /// Returns [`Error::InvalidInput`] if `k` is below one or not finite.
    pub fn with_coverage_factor(mut self, k: f64) -> Result<Self> {
        self.coverage_factor = CoverageFactor::new(k)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }
}

#[derive(Clone, Copy, Debug)]
struct Known {
    measurement: Measurement<f64>,
    estimate: Estimate<f64>,
}

/// The quantities of one experiment, measured and derived, in the order they were added
///
/// Derived quantities propagate the combined standard uncertainties of their inputs. Coverage
/// factors only scale what is reported, so a quantity with `k > 1` still enters later
/// derivations with its standard uncertainty.
#[derive(Clone, Debug)]
pub struct Analysis {
    name: String,
    known: HashMap<String, Known>,
    summaries: Vec<QuantitySummary>,
    entries: Vec<ReportEntry>,
}

impl Analysis {
    /// Summarise every measured quantity of an experiment
    ///
    /// # Errors
    /// Returns an error if the configuration is inconsistent or a quantity cannot be summarised.
    pub fn new(config: &ExperimentConfig) -> Result<Self> {
        Self::from_quantities(&config.name, &config.measured_quantities()?)
    }

    /// # Errors
    /// Returns [`Error::InvalidInput`] if two quantities share a name or a quantity cannot be
    /// summarised.
    pub fn from_quantities(name: impl Into<String>, quantities: &[MeasuredQuantity]) -> Result<Self> {
        let mut analysis = Self {
            name: name.into(),
            known: HashMap::new(),
            summaries: vec![],
            entries: vec![],
        };

        for quantity in quantities {
            let summary = quantity.summarize()?;
            analysis.record(
                summary.name(),
                summary.measurement(),
                summary.combined(),
                summary.report(),
            )?;
            analysis.summaries.push(summary);
        }

        Ok(analysis)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate a derived quantity from quantities already in the analysis and record it
    ///
    /// # Errors
    /// - [`Error::UnknownQuantity`] if an input is not in the analysis
    /// - [`Error::InvalidInput`] if the name is taken or the formula's gradient has the wrong length
    /// - [`Error::UndefinedResult`] if the formula is not finite at the input means
    pub fn derive<F: Formula<f64>>(&mut self, quantity: &DerivedQuantity<F>) -> Result<ReportEntry> {
        self.check_free(&quantity.name)?;
        let inputs = quantity
            .inputs
            .iter()
            .map(|input| self.measurement(input))
            .collect::<Result<Vec<_>>>()?;

        let measurement = evaluate(&quantity.formula, &inputs)?;
        debug!(
            quantity = %quantity.name,
            inputs = ?quantity.inputs,
            value = measurement.value,
            u = measurement.uncertainty,
            "derived quantity"
        );

        let entry = ReportEntry::new(
            &quantity.name,
            measurement.value,
            quantity.coverage_factor.expand(measurement.uncertainty),
            quantity.coverage_factor.get(),
            &quantity.unit,
        );
        self.record(
            &quantity.name,
            measurement,
            Estimate::propagated(measurement.uncertainty),
            entry.clone(),
        )?;
        Ok(entry)
    }

    /// Add a quantity determined outside the analysis, such as a fitted slope and its standard error
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the name is taken or `value` is not finite.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        value: f64,
        estimate: Estimate<f64>,
    ) -> Result<ReportEntry> {
        let name = name.into();
        self.check_free(&name)?;
        let measurement = Measurement::new(value, estimate.standard_uncertainty())?;
        let entry = ReportEntry::new(&name, value, estimate.standard_uncertainty(), 1.0, unit);
        self.record(&name, measurement, estimate, entry.clone())?;
        Ok(entry)
    }

    /// # Errors
    /// Returns [`Error::UnknownQuantity`] if no quantity is called `name`.
    pub fn measurement(&self, name: &str) -> Result<Measurement<f64>> {
        self.lookup(name).map(|known| known.measurement)
    }

    /// # Errors
    /// Returns [`Error::UnknownQuantity`] if no quantity is called `name`.
    pub fn estimate(&self, name: &str) -> Result<Estimate<f64>> {
        self.lookup(name).map(|known| known.estimate)
    }

    pub fn summaries(&self) -> &[QuantitySummary] {
        &self.summaries
    }

    /// Report entries of every quantity, measured ones first
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    fn lookup(&self, name: &str) -> Result<&Known> {
        self.known
            .get(name)
            .ok_or_else(|| Error::UnknownQuantity(name.to_owned()))
    }

    fn check_free(&self, name: &str) -> Result<()> {
        if self.known.contains_key(name) {
            Err(Error::invalid(format!(
                "a quantity named '{name}' is already in the analysis"
            )))
        } else {
            Ok(())
        }
    }

    fn record(
        &mut self,
        name: &str,
        measurement: Measurement<f64>,
        estimate: Estimate<f64>,
        entry: ReportEntry,
    ) -> Result<()> {
        self.check_free(name)?;
        self.known.insert(
            name.to_owned(),
            Known {
                measurement,
                estimate,
            },
        );
        self.entries.push(entry);
        Ok(())
    }
}
