use num_traits::Float;

use crate::{Error, Result};

/// Where a standard uncertainty came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    TypeA,
    TypeB,
    Combined,
    Propagated,
}

/// A standard uncertainty tagged with its origin
///
/// Only `TypeA` and `TypeB` estimates are built from inputs; `Combined` and `Propagated` ones are
/// produced by [`combine_estimates`] and the propagation engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate<E> {
    pub(crate) standard_uncertainty: E,
    pub(crate) source: Source,
}

impl<E: Float> Estimate<E> {
    /// # Errors
    /// Returns [`Error::InvalidInput`] if `standard_uncertainty` is negative or not finite.
    pub fn type_a(standard_uncertainty: E) -> Result<Self> {
        Self::input(standard_uncertainty, Source::TypeA)
    }

    /// # Errors
    /// Returns [`Error::InvalidInput`] if `standard_uncertainty` is negative or not finite.
    pub fn type_b(standard_uncertainty: E) -> Result<Self> {
        Self::input(standard_uncertainty, Source::TypeB)
    }

    fn input(standard_uncertainty: E, source: Source) -> Result<Self> {
        if !standard_uncertainty.is_finite() || standard_uncertainty < E::zero() {
            return Err(Error::invalid("standard uncertainty must be finite and non-negative"));
        }
        Ok(Self {
            standard_uncertainty,
            source,
        })
    }

    pub(crate) const fn propagated(standard_uncertainty: E) -> Self {
        Self {
            standard_uncertainty,
            source: Source::Propagated,
        }
    }

    pub const fn standard_uncertainty(&self) -> E {
        self.standard_uncertainty
    }

    pub const fn source(&self) -> Source {
        self.source
    }
}

/// Root-sum-of-squares combination of independent Type-A and Type-B components
///
/// The Type-B term is instrumental rather than statistical, so it is not reduced by averaging and
/// applies to the mean unchanged.
pub fn combine<E: Float>(type_a: E, type_b: E) -> E {
    type_a.hypot(type_b)
}

/// Combine a Type-A and a Type-B [`Estimate`] into a `Combined` one
///
/// # Errors
/// Returns [`Error::InvalidInput`] if the estimates are not one Type-A and one Type-B component.
pub fn combine_estimates<E: Float>(type_a: Estimate<E>, type_b: Estimate<E>) -> Result<Estimate<E>> {
    if type_a.source != Source::TypeA || type_b.source != Source::TypeB {
        return Err(Error::invalid(format!(
            "expected a Type-A and a Type-B component, got {:?} and {:?}",
            type_a.source, type_b.source
        )));
    }
    Ok(Estimate {
        standard_uncertainty: combine(type_a.standard_uncertainty, type_b.standard_uncertainty),
        source: Source::Combined,
    })
}

/// Expanded uncertainty `k * u_c`
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `coverage_factor` is below one or not finite.
pub fn expand<E: Float>(combined: E, coverage_factor: E) -> Result<E> {
    let k = CoverageFactor::new(coverage_factor)?;
    Ok(k.expand(combined))
}

/// Multiplier applied to a standard uncertainty to reach a stated confidence level
///
/// Every quantity carries its own factor; the default is one, reporting the standard uncertainty.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct CoverageFactor<E>(E);

impl<E: Float> CoverageFactor<E> {
    /// # Errors
    /// Returns [`Error::InvalidInput`] if `k` is below one or not finite.
    pub fn new(k: E) -> Result<Self> {
        if !k.is_finite() || k < E::one() {
            return Err(Error::invalid("coverage factor must be finite and at least one"));
        }
        Ok(Self(k))
    }

    pub fn standard() -> Self {
        Self(E::one())
    }

    pub const fn get(&self) -> E {
        self.0
    }

    pub fn expand(&self, combined: E) -> E {
        self.0 * combined
    }
}

impl<E: Float> Default for CoverageFactor<E> {
    fn default() -> Self {
        Self::standard()
    }
}
