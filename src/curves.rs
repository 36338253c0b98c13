// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interpolation curves that squash the color gradient in various
//! ways before a palette is applied.  Each maps (0, 1) onto (0, 1);
//! nothing is clamped, so values outside that interval, and the NaNs
//! and infinities some curves make of them, pass straight through.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::sampler::{NormalizedGrid, RawGrid};

/// The fixed set of interpolation curves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Curve {
    /// `x`
    Linear,
    /// `sin(x·π/2)`
    Sin,
    /// `ln(x·maxIter) / ln(maxIter)`; undefined at zero.
    Autolog,
    /// `ln(x·4² + 1) / ln(4² + 1)`
    Log2,
    /// `ln(x·4³ + 1) / ln(4³ + 1)`
    Log3,
    /// `ln(x·4⁴ + 1) / ln(4⁴ + 1)`
    Log4,
    /// `x^(1/2)`
    Gamma2,
    /// `x^(1/3)`
    Gamma3,
    /// `x^(1/4)`
    Gamma4,
}

/// Every curve, in menu order.
pub const CURVES: [Curve; 9] = [
    Curve::Linear,
    Curve::Sin,
    Curve::Autolog,
    Curve::Log2,
    Curve::Log3,
    Curve::Log4,
    Curve::Gamma2,
    Curve::Gamma3,
    Curve::Gamma4,
];

fn log_n(x: f64, n: i32) -> f64 {
    let scale = 4f64.powi(n);
    (x * scale + 1.0).ln() / (scale + 1.0).ln()
}

impl Curve {
    /// The display name of the curve.
    pub fn name(self) -> &'static str {
        match self {
            Curve::Linear => "Linear",
            Curve::Sin => "Sin",
            Curve::Autolog => "Autolog",
            Curve::Log2 => "Log 2",
            Curve::Log3 => "Log 3",
            Curve::Log4 => "Log 4",
            Curve::Gamma2 => "Gamma 2",
            Curve::Gamma3 => "Gamma 3",
            Curve::Gamma4 => "Gamma 4",
        }
    }

    /// Applies the curve to one value.
    #[inline]
    pub fn apply(self, x: f64, max_iter: u32) -> f64 {
        match self {
            Curve::Linear => x,
            Curve::Sin => (x * PI / 2.0).sin(),
            Curve::Autolog => {
                let m = f64::from(max_iter);
                (x * m).ln() / m.ln()
            }
            Curve::Log2 => log_n(x, 2),
            Curve::Log3 => log_n(x, 3),
            Curve::Log4 => log_n(x, 4),
            Curve::Gamma2 => x.powf(1.0 / 2.0),
            Curve::Gamma3 => x.powf(1.0 / 3.0),
            Curve::Gamma4 => x.powf(1.0 / 4.0),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercases and drops spaces, dashes and underscores, so that
/// "Log 2", "log2" and "LOG-2" all name the same thing.
pub(crate) fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| !(c.is_whitespace() || *c == '-' || *c == '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Curve {
    type Err = String;

    fn from_str(s: &str) -> Result<Curve, String> {
        let wanted = fold_name(s);
        CURVES
            .iter()
            .cloned()
            .find(|curve| fold_name(curve.name()) == wanted)
            .ok_or_else(|| format!("unknown curve '{}'", s))
    }
}

/// Applies `curve` to every entry of the grid.
pub fn normalize(grid: &RawGrid, max_iter: u32, curve: Curve) -> NormalizedGrid {
    grid.map(|x| curve.apply(x, max_iter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn endpoints() {
        for &curve in &[Curve::Linear, Curve::Sin, Curve::Gamma2, Curve::Gamma3, Curve::Gamma4] {
            assert!(close(curve.apply(0.0, 40), 0.0), "{}(0)", curve);
            assert!(close(curve.apply(1.0, 40), 1.0), "{}(1)", curve);
        }
        for &curve in &[Curve::Log2, Curve::Log3, Curve::Log4] {
            assert!(close(curve.apply(0.0, 40), 0.0), "{}(0)", curve);
            assert!(close(curve.apply(1.0, 40), 1.0), "{}(1)", curve);
        }
        assert!(close(Curve::Autolog.apply(1.0, 40), 1.0));
    }

    #[test]
    fn autolog_is_undefined_at_zero() {
        let v = Curve::Autolog.apply(0.0, 40);
        assert!(v.is_nan() || v == std::f64::NEG_INFINITY);
    }

    #[test]
    fn out_of_range_values_pass_through() {
        assert!(Curve::Gamma2.apply(-0.1, 40).is_nan());
        assert!(Curve::Linear.apply(1.02, 40) > 1.0);
        assert!(Curve::Log2.apply(std::f64::NAN, 40).is_nan());
    }

    #[test]
    fn curves_are_monotone_inside_the_interval() {
        for &curve in CURVES.iter() {
            let mut last = curve.apply(0.01, 50);
            for k in 2..100 {
                let next = curve.apply(f64::from(k) / 100.0, 50);
                assert!(next > last, "{} not increasing at {}", curve, k);
                last = next;
            }
        }
    }

    #[test]
    fn names_round_trip() {
        for &curve in CURVES.iter() {
            assert_eq!(curve.name().parse::<Curve>(), Ok(curve));
        }
        assert_eq!("log2".parse::<Curve>(), Ok(Curve::Log2));
        assert_eq!("GAMMA-3".parse::<Curve>(), Ok(Curve::Gamma3));
        assert!("cubic".parse::<Curve>().is_err());
    }

    #[test]
    fn normalize_is_elementwise() {
        let grid = RawGrid::from_columns(2, 2, vec![0.0, 0.25, 0.5, 1.0]);
        let out = normalize(&grid, 30, Curve::Gamma2);
        let expected = [0.0, 0.5, 0.5f64.sqrt(), 1.0];
        for (got, want) in out.values().iter().zip(expected.iter()) {
            assert!(close(*got, *want), "{} != {}", got, want);
        }
    }
}
