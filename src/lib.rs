#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time fractals for arbitrary polynomial maps
//!
//! The Mandelbrot set is what you get by taking a point `c` on the
//! complex plane, iterating `z ← z² + c`, and recording how quickly
//! `z` runs off to infinity.  Nothing about that procedure needs the
//! map to be `z² + c`: any polynomial in `z` and `c` will do, and each
//! gives its own picture.
//!
//! This crate takes such a polynomial as a string, reduces it to a
//! table of coefficients and a compiled evaluator, iterates it over a
//! lattice of points on the complex plane, smooths the iteration
//! counts using the degree of the polynomial in `z`, and colors the
//! result through one of a fixed set of curves and palettes.
//!
//! ```no_run
//! use polybrot::{generate, Request};
//!
//! let report = generate(&Request::new("z**3 - c*z + c", "out.png")).unwrap();
//! println!("took {:.4} seconds", report.elapsed.as_secs_f64());
//! ```

extern crate colorgrad;
extern crate crossbeam;
extern crate failure;
extern crate image;
#[macro_use]
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate tracing;

pub mod curves;
pub mod error;
pub mod escape;
pub mod expression;
pub mod generator;
pub mod palettes;
pub mod planes;
pub mod polynomial;
pub mod raster;
pub mod sampler;

pub use crate::curves::{normalize, Curve, CURVES};
pub use crate::error::{FractalError, ParseError, Result};
pub use crate::escape::escape_time;
pub use crate::generator::{generate, Event, Fractal, Generator, Job, Report, Request};
pub use crate::palettes::{Palette, PALETTES};
pub use crate::planes::{Lattice, Viewport};
pub use crate::polynomial::{compile, validate, CoefficientTable, Polynomial};
pub use crate::raster::{colorize, Raster};
pub use crate::sampler::{sample, Grid, NormalizedGrid, RawGrid};
