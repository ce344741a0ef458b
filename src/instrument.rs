use num_traits::Float;

use crate::{Error, Result};

/// How a quantity is read from the instrument
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reading {
    /// The quantity is a single scale reading
    #[default]
    Direct,
    /// The quantity is `|b - a|` for two independent scale readings, as for a fringe spacing or a
    /// ring diameter read off a travelling microscope
    Difference,
}

impl Reading {
    pub const fn from_difference_flag(is_difference: bool) -> Self {
        if is_difference {
            Self::Difference
        } else {
            Self::Direct
        }
    }
}

/// Type-B standard uncertainty for an instrument with resolution limit `limit`
///
/// The error of a single reading is modelled as uniform on $[-\Delta, \Delta]$, giving a standard
/// uncertainty of $\Delta / \sqrt{3}$. A difference of two independent readings with unit
/// sensitivity each combines two such terms in quadrature
///
/// $$
///     u_B = \sqrt{\left(\frac{\Delta}{\sqrt{3}}\right)^2 + \left(\frac{\Delta}{\sqrt{3}}\right)^2}
///         = \Delta \sqrt{2 / 3}.
/// $$
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `limit` is negative or not finite.
pub fn type_b<E: Float>(limit: E, reading: Reading) -> Result<E> {
    if !limit.is_finite() || limit < E::zero() {
        return Err(Error::invalid("instrument limit must be a finite, non-negative number"));
    }
    let three = E::from(3.0).ok_or_else(|| Error::invalid("float type cannot represent 3"))?;
    let single = limit / three.sqrt();

    Ok(match reading {
        Reading::Direct => single,
        Reading::Difference => single.hypot(single),
    })
}

/// Type-B standard uncertainty selected by a plain difference flag
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `limit` is negative or not finite.
pub fn instrument_uncertainty<E: Float>(limit: E, is_difference: bool) -> Result<E> {
    type_b(limit, Reading::from_difference_flag(is_difference))
}
