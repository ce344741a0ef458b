use ndarray::{Array1, LinalgScalar};
use num_traits::Float;

/// Root sum of squares of the elements of `terms`
///
/// # Examples
///
/// ```
/// use lab_uncertainty::math::root_sum_of_squares;
/// use ndarray::arr1;
///
/// let terms = arr1(&[3., -4.]);
/// assert_eq!(root_sum_of_squares(&terms), 5.);
/// ```
pub fn root_sum_of_squares<T: Float + LinalgScalar>(terms: &Array1<T>) -> T {
    terms.dot(terms).sqrt()
}

/// Central finite-difference estimate of the gradient of `f` at `x`
///
/// The step along coordinate $i$ is $\epsilon^{1/3} |x_i|$, which balances the truncation error of a
/// central difference against rounding in `f` at any scale of $x_i$. A zero coordinate steps by
/// $\epsilon^{1/3}$.
///
/// # Examples
///
/// ```
/// use lab_uncertainty::math::central_difference;
/// use ndarray::{arr1, Array1};
///
/// let f = |x: &Array1<f64>| x[0] * x[0] * x[1];
/// let gradient = central_difference(f, &arr1(&[2., 3.]));
///
/// assert!((gradient[0] - 12.).abs() < 1e-6);
/// assert!((gradient[1] - 4.).abs() < 1e-6);
/// ```
pub fn central_difference<T: Float>(f: impl Fn(&Array1<T>) -> T, x: &Array1<T>) -> Array1<T> {
    let step = T::epsilon().cbrt();
    let two = T::one() + T::one();

    (0..x.len())
        .map(|ii| {
            let delta = if x[ii].is_zero() {
                step
            } else {
                step * x[ii].abs()
            };
            let mut plus = x.clone();
            plus[ii] = plus[ii] + delta;
            let mut minus = x.clone();
            minus[ii] = minus[ii] - delta;
            (f(&plus) - f(&minus)) / (two * delta)
        })
        .collect()
}
