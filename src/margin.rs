use num_traits::Float;

use crate::{Error, Result};

/// A central value and its standard uncertainty
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement<E> {
    pub(crate) value: E,
    pub(crate) uncertainty: E,
}

impl<E: Float> Measurement<E> {
    /// Build a measurement from a value and a standard uncertainty
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if either number is not finite or the uncertainty is
    /// negative.
    pub fn new(value: E, uncertainty: E) -> Result<Self> {
        if !value.is_finite() || !uncertainty.is_finite() {
            return Err(Error::invalid("measurement value and uncertainty must be finite"));
        }
        if uncertainty < E::zero() {
            return Err(Error::invalid("standard uncertainty must be non-negative"));
        }
        Ok(Self { value, uncertainty })
    }

    /// A measurement known exactly, such as a tabulated constant
    pub fn exact(value: E) -> Self {
        Self {
            value,
            uncertainty: E::zero(),
        }
    }

    pub const fn value(&self) -> E {
        self.value
    }

    pub const fn uncertainty(&self) -> E {
        self.uncertainty
    }

    /// `u / |value|`, or `None` when the value is zero
    pub fn relative_uncertainty(&self) -> Option<E> {
        if self.value.is_zero() {
            None
        } else {
            Some(self.uncertainty / self.value.abs())
        }
    }
}
