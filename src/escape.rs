// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-point escape-time computation.
//!
//! Unlike the Mandelbrot set (where z starts at zero and c is the
//! point) or a Julia set (where c is one constant for the whole
//! image), here both the starting iterate and the parameter are the
//! sampled point: z₀ = c = point.  The result is continuous rather
//! than an integer count, so that neighbouring bands blend into each
//! other.

use num::complex::Complex64;

use crate::polynomial::Polynomial;

/// Radius beyond which an orbit is considered to have escaped.
pub const BOUND: f64 = 5.0;

/// `BOUND²`, compared against `|z|²` to keep the square root out of
/// the loop.
pub const CONVERGENCE_LIMIT: f64 = BOUND * BOUND;

/// The continuous escape estimate `n - ln(ln|z| / ln B) / ln d`.  The
/// logarithms are complex: when `|z| < 1` the inner quotient is
/// negative and its logarithm picks up an imaginary part, of which
/// only the real part survives.
#[inline]
pub fn smooth(n: u32, z: Complex64, degree: usize) -> f64 {
    let ratio = Complex64::new(z.norm().ln(), 0.0) / BOUND.ln();
    let correction = ratio.ln() / (degree as f64).ln();
    (Complex64::new(f64::from(n), 0.0) - correction).re
}

/// Iterates the map from `z₀ = c = point` until `|z|² > 25` or
/// `max_iter` steps have been taken, and returns the smoothed count.
/// Points that never escape get the same correction applied to their
/// final iterate.
pub fn escape_time(point: Complex64, map: &Polynomial, max_iter: u32) -> f64 {
    let degree = map.z_degree();
    let c = point;
    let mut z = point;
    for n in 0..max_iter {
        if z.norm_sqr() > CONVERGENCE_LIMIT {
            return smooth(n, z, degree);
        }
        z = map.eval(z, c);
    }
    smooth(max_iter, z, degree)
}

/// The integer step at which `point` first lies outside the bound, if
/// it does within `max_iter` steps.
pub fn escape_step(point: Complex64, map: &Polynomial, max_iter: u32) -> Option<u32> {
    let mut z = point;
    for n in 0..max_iter {
        if z.norm_sqr() > CONVERGENCE_LIMIT {
            return Some(n);
        }
        z = map.eval(z, point);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::compile;

    #[test]
    fn bounded_points_stay_within_the_limit() {
        let map = compile("z**2 + c").unwrap();
        let max_iter = 50;
        for &point in &[
            Complex64::new(-0.1, 0.1),
            Complex64::new(-0.5, 0.0),
            Complex64::new(0.1, 0.2),
            Complex64::new(-0.2, -0.3),
        ] {
            assert_eq!(escape_step(point, &map, max_iter), None);
            let t = escape_time(point, &map, max_iter);
            assert!(t.is_finite(), "{} gave {}", point, t);
            assert!(
                t >= 0.0 && t <= f64::from(max_iter) + 1.0,
                "{} gave {}",
                point,
                t
            );
        }
    }

    #[test]
    fn escaping_points_come_in_under_the_next_step() {
        let map = compile("z**2 + c").unwrap();
        for &point in &[
            Complex64::new(1.0, 1.0),
            Complex64::new(0.5, 0.5),
            Complex64::new(-2.0, 0.3),
            Complex64::new(0.3, 0.6),
        ] {
            let k = escape_step(point, &map, 100).unwrap();
            let t = escape_time(point, &map, 100);
            assert!(t < f64::from(k + 1), "{} escaped at {} but gave {}", point, k, t);
        }
    }

    #[test]
    fn outside_the_bound_already_escapes_at_zero() {
        let map = compile("z**2 + c").unwrap();
        let point = Complex64::new(6.0, 0.0);
        assert_eq!(escape_step(point, &map, 10), Some(0));
        let expected = -((6.0f64.ln() / 5.0f64.ln()).ln() / 2.0f64.ln());
        assert!((escape_time(point, &map, 10) - expected).abs() < 1e-12);
    }

    #[test]
    fn smoothing_uses_the_degree_of_the_map() {
        let z = Complex64::new(30.0, 0.0);
        let quadratic = smooth(3, z, 2);
        let cubic = smooth(3, z, 3);
        assert!(quadratic < cubic);
        assert!(cubic < 3.0);
    }

    #[test]
    fn seed_and_parameter_are_both_the_point() {
        // z -> z + c from z0 = c = 1 walks 1, 2, 3, 4, 5, 6: escapes at step 5.
        let map = compile("z + c").unwrap();
        assert_eq!(escape_step(Complex64::new(1.0, 0.0), &map, 20), Some(5));
    }

    #[test]
    fn the_origin_is_a_numeric_edge() {
        // z stays exactly 0, so ln|z| is -inf; this is an artifact, not a panic.
        let map = compile("z**2 + c").unwrap();
        let t = escape_time(Complex64::new(0.0, 0.0), &map, 30);
        assert!(!t.is_finite());
    }
}
