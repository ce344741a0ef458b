use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::MeasuredQuantity;
use crate::instrument::Reading;
use crate::{Error, Result};

/// An experiment as written in its TOML file
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default, rename = "quantity")]
    pub quantities: Vec<QuantityConfig>,
}

/// One measured quantity of an experiment
///
/// Exactly one of `readings` and `pairs` is given. Each pair is reduced to `|b - a|` and marks the
/// quantity as a difference of two scale readings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct QuantityConfig {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    /// Instrument resolution limit, in the unit of the readings
    pub limit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readings: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<[f64; 2]>>,
    /// Set when `readings` already hold differences of two scale readings
    #[serde(default)]
    pub difference: bool,
    #[serde(default = "standard_coverage")]
    pub coverage_factor: f64,
}

const fn standard_coverage() -> f64 {
    1.0
}

impl ExperimentConfig {
    /// Parse an experiment from TOML
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the document does not deserialize and [`Error::InvalidInput`]
    /// if the quantities are inconsistent, see [`ExperimentConfig::measured_quantities`].
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.check_names()?;
        debug!(
            experiment = %config.name,
            quantities = config.quantities.len(),
            "read experiment configuration"
        );
        Ok(config)
    }

    /// Read an experiment from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, or as [`ExperimentConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// The measured quantities, in file order
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if a name is repeated, a quantity has both or neither of
    /// `readings` and `pairs`, or a coverage factor is below one.
    pub fn measured_quantities(&self) -> Result<Vec<MeasuredQuantity>> {
        self.check_names()?;
        self.quantities
            .iter()
            .map(QuantityConfig::to_measured)
            .collect()
    }

    fn check_names(&self) -> Result<()> {
        let repeated = self
            .quantities
            .iter()
            .map(|quantity| quantity.name.as_str())
            .duplicates()
            .collect::<Vec<_>>();
        if repeated.is_empty() {
            Ok(())
        } else {
            warn!(experiment = %self.name, ?repeated, "repeated quantity names");
            Err(Error::invalid(format!(
                "quantity names must be unique, repeated: {}",
                repeated.join(", ")
            )))
        }
    }
}

impl QuantityConfig {
    /// Convert to a [`MeasuredQuantity`], reducing pairs to differences
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if both or neither of `readings` and `pairs` are given, or
    /// the coverage factor is below one.
    pub fn to_measured(&self) -> Result<MeasuredQuantity> {
        let quantity = match (&self.readings, &self.pairs) {
            (Some(readings), None) => MeasuredQuantity::new(&self.name, readings.clone(), self.limit)
                .with_reading(Reading::from_difference_flag(self.difference)),
            (None, Some(pairs)) => MeasuredQuantity::from_pairs(&self.name, pairs, self.limit),
            (Some(_), Some(_)) => {
                warn!(quantity = %self.name, "both readings and pairs given");
                return Err(Error::invalid(format!(
                    "quantity '{}' gives both readings and pairs",
                    self.name
                )));
            }
            (None, None) => {
                warn!(quantity = %self.name, "no readings given");
                return Err(Error::invalid(format!(
                    "quantity '{}' gives neither readings nor pairs",
                    self.name
                )));
            }
        };

        quantity
            .with_unit(&self.unit)
            .with_coverage_factor(self.coverage_factor)
    }
}
