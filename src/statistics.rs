use num_traits::Float;
use tracing::debug;

use crate::{Error, Result};

/// Distributional summary of a set of repeated readings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary<E> {
    pub(crate) count: usize,
    pub(crate) mean: E,
    pub(crate) standard_deviation: E,
    pub(crate) type_a: E,
}

impl<E: Copy> Summary<E> {
    pub const fn count(&self) -> usize {
        self.count
    }

    pub const fn mean(&self) -> E {
        self.mean
    }

    /// Bessel-corrected sample standard deviation
    pub const fn standard_deviation(&self) -> E {
        self.standard_deviation
    }

    /// Standard error of the mean
    pub const fn type_a(&self) -> E {
        self.type_a
    }
}

/// Compute the mean, sample standard deviation and Type-A uncertainty of `readings`
///
/// The sample standard deviation uses the $n - 1$ denominator
///
/// $$
///     s = \sqrt{\frac{1}{n - 1} \sum_i \left(x_i - \bar{x}\right)^2},
/// $$
///
/// and the Type-A uncertainty is the standard error of the mean $s / \sqrt{n}$.
///
/// A single reading has no spread to estimate. By convention both the standard deviation and the
/// Type-A uncertainty are exactly zero in that case, and the instrument limit alone sets the
/// uncertainty of the quantity.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `readings` is empty or contains a non-finite value.
pub fn estimate<E: Float>(readings: &[E]) -> Result<Summary<E>> {
    if readings.is_empty() {
        return Err(Error::invalid("cannot summarise an empty set of readings"));
    }
    if let Some(position) = readings.iter().position(|x| !x.is_finite()) {
        return Err(Error::invalid(format!("reading {position} is not finite")));
    }

    let count = readings.len();
    let n = cast::<E>(count)?;
    let mean = readings.iter().fold(E::zero(), |a, &b| a + b) / n;

    let standard_deviation = if count == 1 {
        E::zero()
    } else {
        let summed = readings
            .iter()
            .fold(E::zero(), |a, &b| a + (b - mean).powi(2));
        (summed / (n - E::one())).sqrt()
    };

    let type_a = standard_deviation / n.sqrt();
    debug!(count, "summarised readings");

    Ok(Summary {
        count,
        mean,
        standard_deviation,
        type_a,
    })
}

pub(crate) fn cast<E: Float>(count: usize) -> Result<E> {
    E::from(count).ok_or_else(|| Error::invalid(format!("{count} does not fit in the float type")))
}
