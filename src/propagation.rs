use ndarray::{Array1, LinalgScalar};
use num_traits::Float;
use tracing::debug;

use crate::margin::Measurement;
use crate::math::{central_difference, root_sum_of_squares};
use crate::{Error, Result};

/// One input to a derived quantity together with its sensitivity coefficient
///
/// The coefficient is $c_i = \partial f / \partial x_i$ evaluated at the means of all inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sensitivity<E> {
    pub(crate) input: Measurement<E>,
    pub(crate) coefficient: E,
}

impl<E: Float> Sensitivity<E> {
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the mean or uncertainty is not finite, or the
    /// uncertainty is negative.
    pub fn new(mean: E, uncertainty: E, coefficient: E) -> Result<Self> {
        Ok(Self {
            input: Measurement::new(mean, uncertainty)?,
            coefficient,
        })
    }

    pub const fn with_measurement(input: Measurement<E>, coefficient: E) -> Self {
        Self { input, coefficient }
    }

    pub const fn coefficient(&self) -> E {
        self.coefficient
    }

    /// The term $c_i u(x_i)$ this input contributes to the propagated uncertainty
    pub fn contribution(&self) -> E {
        self.coefficient * self.input.uncertainty
    }
}

/// First-order propagation of uncorrelated input uncertainties
///
/// `value` is the derived quantity evaluated at the input means. The propagated standard
/// uncertainty is
///
/// $$
///     u(y) = \sqrt{\sum_i \left(c_i u(x_i)\right)^2}.
/// $$
///
/// # Errors
/// Returns [`Error::UndefinedResult`] if `value` or any contribution is not finite, which is how a
/// formula evaluated at a singular point (a division by a zero mean, say) shows up.
pub fn propagate<E: Float + LinalgScalar>(inputs: &[Sensitivity<E>], value: E) -> Result<Measurement<E>> {
    if !value.is_finite() {
        return Err(Error::undefined(
            "derived quantity is not finite at the input means",
        ));
    }

    let contributions: Array1<E> = inputs.iter().map(Sensitivity::contribution).collect();
    if let Some(position) = contributions.iter().position(|c| !c.is_finite()) {
        return Err(Error::undefined(format!(
            "sensitivity to input {position} is not finite at the input means"
        )));
    }

    let uncertainty = root_sum_of_squares(&contributions);
    debug!(inputs = inputs.len(), "propagated uncertainty");

    Ok(Measurement { value, uncertainty })
}

/// A closed-form derived quantity $y = f(x_1, \dots, x_m)$
///
/// Any closure taking the vector of input means is a formula; its sensitivities are estimated by
/// central finite differences. Formulas that know their own partial derivatives override
/// [`Formula::gradient`], see [`Analytic`] and [`PowerLaw`].
pub trait Formula<E: Float> {
    fn evaluate(&self, x: &Array1<E>) -> E;

    /// Partial derivatives of the formula at `x`, in input order
    fn gradient(&self, x: &Array1<E>) -> Array1<E> {
        central_difference(|p| self.evaluate(p), x)
    }
}

impl<E: Float, F: Fn(&Array1<E>) -> E> Formula<E> for F {
    fn evaluate(&self, x: &Array1<E>) -> E {
        self(x)
    }
}

/// A formula supplied together with its analytic gradient
pub struct Analytic<F, G> {
    pub value: F,
    pub gradient: G,
}

impl<E, F, G> Formula<E> for Analytic<F, G>
where
    E: Float,
    F: Fn(&Array1<E>) -> E,
    G: Fn(&Array1<E>) -> Array1<E>,
{
    fn evaluate(&self, x: &Array1<E>) -> E {
        (self.value)(x)
    }

    fn gradient(&self, x: &Array1<E>) -> Array1<E> {
        (self.gradient)(x)
    }
}

/// A pure product of powers $y = C \prod_i x_i^{p_i}$
///
/// Besides the general law, a power law can combine relative uncertainties directly
///
/// $$
///     \left(\frac{u(y)}{y}\right)^2 = \sum_i \left(p_i \frac{u(x_i)}{x_i}\right)^2,
/// $$
///
/// which agrees with [`propagate`] to floating-point precision.
#[derive(Clone, Debug, PartialEq)]
pub struct PowerLaw<E> {
    pub(crate) coefficient: E,
    pub(crate) powers: Vec<E>,
}

impl<E: Float> PowerLaw<E> {
    pub fn new(coefficient: E, powers: Vec<E>) -> Self {
        Self {
            coefficient,
            powers,
        }
    }

    /// Relative standard uncertainty $u(y) / |y|$ of the power law at `inputs`
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if the number of inputs does not match the number of powers
    /// - [`Error::UndefinedResult`] if any input mean is zero
    pub fn relative_uncertainty(&self, inputs: &[Measurement<E>]) -> Result<E> {
        self.check_arity(inputs.len())?;
        if inputs.iter().any(|input| input.value.is_zero()) {
            return Err(Error::undefined(
                "relative uncertainty needs every input mean to be non-zero",
            ));
        }

        let summed = inputs
            .iter()
            .zip(&self.powers)
            .fold(E::zero(), |a, (input, &power)| {
                a + (power * input.uncertainty / input.value).powi(2)
            });
        Ok(summed.sqrt())
    }

    /// Propagate through the power law using relative uncertainties
    ///
    /// # Errors
    /// As [`PowerLaw::relative_uncertainty`], and [`Error::UndefinedResult`] if the value is not
    /// finite.
    pub fn propagate_relative(&self, inputs: &[Measurement<E>]) -> Result<Measurement<E>> {
        let relative = self.relative_uncertainty(inputs)?;
        let means: Array1<E> = inputs.iter().map(Measurement::value).collect();
        let value = self.evaluate(&means);
        if !value.is_finite() {
            return Err(Error::undefined("power law is not finite at the input means"));
        }
        Ok(Measurement {
            value,
            uncertainty: value.abs() * relative,
        })
    }

    fn check_arity(&self, len: usize) -> Result<()> {
        if len == self.powers.len() {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "power law takes {} inputs, got {len}",
                self.powers.len()
            )))
        }
    }
}

impl<E: Float> Formula<E> for PowerLaw<E> {
    fn evaluate(&self, x: &Array1<E>) -> E {
        x.iter()
            .zip(&self.powers)
            .fold(self.coefficient, |a, (&xi, &pi)| a * xi.powf(pi))
    }

    fn gradient(&self, x: &Array1<E>) -> Array1<E> {
        (0..self.powers.len())
            .map(|ii| {
                x.iter()
                    .zip(&self.powers)
                    .enumerate()
                    .fold(self.coefficient, |a, (jj, (&xj, &pj))| {
                        if ii == jj {
                            a * pj * xj.powf(pj - E::one())
                        } else {
                            a * xj.powf(pj)
                        }
                    })
            })
            .collect()
    }
}

/// Evaluate `formula` at the means of `inputs` and propagate their standard uncertainties
///
/// # Errors
/// - [`Error::InvalidInput`] if the formula's gradient does not have one entry per input
/// - [`Error::UndefinedResult`] if the formula or its gradient is not finite at the means
pub fn evaluate<E, F>(formula: &F, inputs: &[Measurement<E>]) -> Result<Measurement<E>>
where
    E: Float + LinalgScalar,
    F: Formula<E> + ?Sized,
{
    let means: Array1<E> = inputs.iter().map(Measurement::value).collect();
    let value = formula.evaluate(&means);
    if !value.is_finite() {
        return Err(Error::undefined(
            "derived quantity is not finite at the input means",
        ));
    }

    let gradient = formula.gradient(&means);
    if gradient.len() != inputs.len() {
        return Err(Error::invalid(format!(
            "formula gradient has {} entries for {} inputs",
            gradient.len(),
            inputs.len()
        )));
    }

    let sensitivities = inputs
        .iter()
        .zip(gradient)
        .map(|(&input, coefficient)| Sensitivity::with_measurement(input, coefficient))
        .collect::<Vec<_>>();

    propagate(&sensitivities, value)
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, Array1};
    use ndarray_rand::rand::{Rng, SeedableRng};
    use proptest::prelude::*;
    use rand_isaac::Isaac64Rng;

    use super::{evaluate, propagate, Analytic, Formula, PowerLaw, Sensitivity};
    use crate::margin::Measurement;
    use crate::math::central_difference;
    use crate::Error;

    fn measurement(value: f64, uncertainty: f64) -> Measurement<f64> {
        Measurement::new(value, uncertainty).unwrap()
    }

    #[test]
    fn density_uncertainty_follows_the_general_law() {
        // rho = m / V
        let mass: f64 = 10.0;
        let volume: f64 = 5.0;
        let inputs = [
            Sensitivity::new(mass, 0.02, 1.0 / volume).unwrap(),
            Sensitivity::new(volume, 0.05, -mass / volume.powi(2)).unwrap(),
        ];

        let density = propagate(&inputs, mass / volume).unwrap();

        let expected = 2.0 * ((0.02f64 / 10.0).powi(2) + (0.05f64 / 5.0).powi(2)).sqrt();
        approx::assert_relative_eq!(density.value(), 2.0);
        approx::assert_relative_eq!(density.uncertainty(), expected, max_relative = 1e-12);
        approx::assert_relative_eq!(density.uncertainty(), 0.020_396, max_relative = 1e-4);
    }

    #[test]
    fn density_by_power_law_matches_the_general_law() {
        let inputs = [measurement(10.0, 0.02), measurement(5.0, 0.05)];
        let density = PowerLaw::new(1.0, vec![1.0, -1.0]);

        let general = evaluate(&density, &inputs).unwrap();
        let relative = density.propagate_relative(&inputs).unwrap();

        approx::assert_relative_eq!(general.value(), relative.value(), max_relative = 1e-12);
        approx::assert_relative_eq!(general.uncertainty(), relative.uncertainty(), max_relative = 1e-12);
    }

    #[test]
    fn non_finite_values_are_undefined() {
        let inputs = [Sensitivity::new(0.0, 0.01, 1.0).unwrap()];
        assert!(matches!(
            propagate(&inputs, f64::INFINITY),
            Err(Error::UndefinedResult(_))
        ));
        assert!(matches!(
            propagate(&inputs, f64::NAN),
            Err(Error::UndefinedResult(_))
        ));
    }

    #[test]
    fn division_by_a_zero_mean_is_undefined() {
        let wedge_diameter = |x: &Array1<f64>| x[0] * 589.3e-6 * 10.0 / (2.0 * x[1]);
        let inputs = [measurement(32.9, 0.004), measurement(0.0, 0.004)];

        assert!(matches!(
            evaluate(&wedge_diameter, &inputs),
            Err(Error::UndefinedResult(_))
        ));
    }

    #[test]
    fn gradients_of_the_wrong_length_are_rejected() {
        let formula = Analytic {
            value: |x: &Array1<f64>| x[0] + x[1],
            gradient: |_: &Array1<f64>| arr1(&[1.0]),
        };
        let inputs = [measurement(1.0, 0.1), measurement(2.0, 0.1)];

        assert!(matches!(
            evaluate(&formula, &inputs),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn opaque_formulas_match_their_analytic_gradient() {
        // Newton's rings: R = (D_m^2 - D_n^2) / (4 (m - n) lambda)
        let wavelength = 589.3e-6;
        let rings = 10.0;
        let radius = move |x: &Array1<f64>| (x[0].powi(2) - x[1].powi(2)) / (4.0 * rings * wavelength);
        let analytic = Analytic {
            value: radius,
            gradient: move |x: &Array1<f64>| {
                arr1(&[x[0], -x[1]]) / (2.0 * rings * wavelength)
            },
        };
        let inputs = [measurement(5.50, 0.0045), measurement(2.27, 0.0052)];

        let numerical = evaluate(&radius, &inputs).unwrap();
        let exact = evaluate(&analytic, &inputs).unwrap();

        approx::assert_relative_eq!(numerical.value(), exact.value());
        approx::assert_relative_eq!(numerical.uncertainty(), exact.uncertainty(), max_relative = 1e-6);
    }

    #[test]
    fn opaque_formulas_hold_for_sub_unit_inputs() {
        // a length of 10 µm, a piston area in m², a wavelength in m
        for (value, uncertainty) in [(1e-5, 1e-7), (8.2958e-4, 2.1e-6), (5.893e-7, 4e-10)] {
            let inputs = [measurement(value, uncertainty)];

            let reciprocal = evaluate(&|x: &Array1<f64>| 1.0 / x[0], &inputs).unwrap();
            let exact = evaluate(&PowerLaw::new(1.0, vec![-1.0]), &inputs).unwrap();
            approx::assert_relative_eq!(reciprocal.uncertainty(), exact.uncertainty(), max_relative = 1e-6);

            let inverse_square = evaluate(&|x: &Array1<f64>| x[0].powi(-2), &inputs).unwrap();
            let exact = evaluate(&PowerLaw::new(1.0, vec![-2.0]), &inputs).unwrap();
            approx::assert_relative_eq!(
                inverse_square.uncertainty(),
                exact.uncertainty(),
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn central_difference_matches_power_law_gradient() {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);

        let num_inputs = rng.gen_range(2..6usize);
        let powers = (0..num_inputs)
            .map(|_| f64::from(rng.gen_range(-3..=3i32)))
            .collect::<Vec<_>>();
        let x: Array1<f64> = (0..num_inputs).map(|_| rng.gen_range(0.5..5.0)).collect();
        let formula = PowerLaw::new(rng.gen_range(0.1..10.0), powers);

        let exact = formula.gradient(&x);
        let numerical = central_difference(|p| formula.evaluate(p), &x);

        for (exact, numerical) in exact.into_iter().zip(numerical) {
            approx::assert_relative_eq!(exact, numerical, max_relative = 1e-6, epsilon = 1e-9);
        }
    }

    #[test]
    fn hollow_cylinder_volume_propagates_all_four_dimensions() {
        // V = pi / 4 (D^2 H - d^2 h)
        let volume = |x: &Array1<f64>| {
            std::f64::consts::FRAC_PI_4 * x[0].powi(2).mul_add(x[1], -x[2].powi(2) * x[3])
        };
        let inputs = [
            measurement(25.317, 0.0159),
            measurement(33.169, 0.0148),
            measurement(14.709, 0.0147),
            measurement(22.080, 0.0577),
        ];

        let result = evaluate(&volume, &inputs).unwrap();

        let (d_outer, height, d_inner, depth) = (25.317f64, 33.169f64, 14.709f64, 22.080f64);
        let terms = [
            std::f64::consts::FRAC_PI_2 * d_outer * height * 0.0159,
            std::f64::consts::FRAC_PI_4 * d_outer.powi(2) * 0.0148,
            std::f64::consts::FRAC_PI_2 * d_inner * depth * 0.0147,
            std::f64::consts::FRAC_PI_4 * d_inner.powi(2) * 0.0577,
        ];
        let expected = terms.iter().map(|t| t.powi(2)).sum::<f64>().sqrt();

        approx::assert_relative_eq!(result.uncertainty(), expected, max_relative = 1e-6);
    }

    proptest! {
        #[test]
        // For a product the relative uncertainties add in quadrature
        fn product_relative_uncertainty_is_quadrature_sum(
            a in 0.1..100.0f64,
            b in -100.0..-0.1f64,
            ua in 0.0..1.0f64,
            ub in 0.0..1.0f64,
        ) {
            let product = Analytic {
                value: |x: &Array1<f64>| x[0] * x[1],
                gradient: |x: &Array1<f64>| arr1(&[x[1], x[0]]),
            };
            let result = evaluate(&product, &[measurement(a, ua), measurement(b, ub)]).unwrap();

            let calculated = (result.uncertainty() / result.value()).powi(2);
            let expected = (ua / a).powi(2) + (ub / b).powi(2);
            approx::assert_relative_eq!(calculated, expected, max_relative = 1e-9);
        }
    }
}
