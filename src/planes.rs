// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Describes the relationship between a rectangle of pixels with its
//! origin at 0,0 and a rectangle on the complex plane, and maps pixel
//! indices to the complex points sampled for them.

use num::Complex;

use crate::error::{FractalError, Result};

/// The region of the complex plane to render, the size of the image
/// to render it into, and how long to follow each orbit.
///
/// Callers that think in screen coordinates pass their on-screen top
/// bound as `y_max` and bottom bound as `y_min`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Real part of the left edge.
    pub x_min: f64,
    /// Real part of the right edge.
    pub x_max: f64,
    /// Imaginary part of the first row of samples.
    pub y_min: f64,
    /// Imaginary part of the last row of samples.
    pub y_max: f64,
    /// Number of samples along the real axis.
    pub width: u32,
    /// Number of samples along the imaginary axis.
    pub height: u32,
    /// Iteration limit per point.
    pub max_iter: u32,
}

impl Default for Viewport {
    /// The classic full view of the Mandelbrot set.
    fn default() -> Self {
        Viewport {
            x_min: -2.0,
            x_max: 1.0,
            y_min: -1.25,
            y_max: 1.25,
            width: 1000,
            height: 800,
            max_iter: 40,
        }
    }
}

impl Viewport {
    /// A viewport from its left-lower and right-upper corners.
    pub fn from_corners(
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
        width: u32,
        height: u32,
        max_iter: u32,
    ) -> Viewport {
        Viewport {
            x_min: leftlower.re,
            x_max: rightupper.re,
            y_min: leftlower.im,
            y_max: rightupper.im,
            width,
            height,
            max_iter,
        }
    }

    /// Rejects viewports no image can be made from.  Runs before any
    /// sampling so that a bad request costs nothing.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FractalError::InvalidViewport(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_iter == 0 {
            return Err(FractalError::InvalidViewport(
                "iteration limit must be positive".to_string(),
            ));
        }
        if !(self.x_min < self.x_max) {
            return Err(FractalError::InvalidViewport(format!(
                "left edge {} is not to the left of right edge {}",
                self.x_min, self.x_max
            )));
        }
        if !(self.y_min.is_finite() && self.y_max.is_finite())
            || !(self.x_min.is_finite() && self.x_max.is_finite())
        {
            return Err(FractalError::InvalidViewport(
                "bounds must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// True when there is nothing to sample.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Evenly spaced samples over a closed interval, in the manner of
/// a linspace: the first and last samples are exactly the
/// bounds, and a single sample sits on the lower bound.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Axis {
    start: f64,
    stop: f64,
    count: usize,
    step: f64,
}

impl Axis {
    /// `count` samples spanning `[start, stop]`.
    pub fn new(start: f64, stop: f64, count: usize) -> Axis {
        let step = if count > 1 {
            (stop - start) / ((count - 1) as f64)
        } else {
            0.0
        };
        Axis {
            start,
            stop,
            count,
            step,
        }
    }

    /// The `index`th sample.
    #[inline]
    pub fn at(&self, index: usize) -> f64 {
        if self.count > 1 && index == self.count - 1 {
            self.stop
        } else {
            self.start + (index as f64) * self.step
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when the axis has no samples.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A pixel on the integral plane: column (x index), row (y index).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps the integral sample grid of a validated viewport onto the
/// complex plane.
#[derive(Copy, Clone, Debug)]
pub struct Lattice {
    viewport: Viewport,
    re: Axis,
    im: Axis,
}

impl Lattice {
    /// Validates the viewport and lays out its sample axes.
    pub fn new(viewport: Viewport) -> Result<Lattice> {
        viewport.validate()?;
        Ok(Lattice {
            viewport,
            re: Axis::new(viewport.x_min, viewport.x_max, viewport.width as usize),
            im: Axis::new(viewport.y_min, viewport.y_max, viewport.height as usize),
        })
    }

    /// The viewport this lattice was built from.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Number of columns (samples along the real axis).
    pub fn width(&self) -> usize {
        self.re.len()
    }

    /// Number of rows (samples along the imaginary axis).
    pub fn height(&self) -> usize {
        self.im.len()
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    /// True when there is nothing to sample.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The complex point sampled for a pixel.
    #[inline]
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(self.re.at(pixel.0), self.im.at(pixel.1))
    }

    /// Offset of a pixel in a column-major grid: all of column 0
    /// first, then column 1, and so on.
    #[inline]
    pub fn offset(&self, pixel: &Pixel) -> usize {
        pixel.0 * self.height() + pixel.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: u32, height: u32) -> Viewport {
        Viewport {
            x_min: -2.0,
            x_max: 2.0,
            y_min: -1.0,
            y_max: 1.0,
            width,
            height,
            max_iter: 10,
        }
    }

    #[test]
    fn lattice_fails_on_bad_shape() {
        let mut v = viewport(4, 4);
        v.x_max = -3.0;
        assert!(Lattice::new(v).is_err());
        assert!(Lattice::new(viewport(0, 4)).is_err());
        assert!(Lattice::new(viewport(4, 0)).is_err());
        let mut v = viewport(4, 4);
        v.max_iter = 0;
        assert!(Lattice::new(v).is_err());
        let mut v = viewport(4, 4);
        v.x_min = std::f64::NAN;
        assert!(Lattice::new(v).is_err());
    }

    #[test]
    fn lattice_passes_on_good_shape() {
        assert!(Lattice::new(viewport(4, 4)).is_ok());
        assert!(Lattice::new(Viewport::default()).is_ok());
    }

    #[test]
    fn inverted_imaginary_axis_is_allowed() {
        let mut v = viewport(3, 3);
        v.y_min = 1.0;
        v.y_max = -1.0;
        let lattice = Lattice::new(v).unwrap();
        assert_eq!(lattice.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, 1.0));
        assert_eq!(lattice.pixel_to_point(&Pixel(0, 2)), Complex::new(-2.0, -1.0));
    }

    #[test]
    fn pixel_to_point_hits_both_bounds() {
        let lattice = Lattice::new(viewport(5, 3)).unwrap();
        assert_eq!(lattice.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -1.0));
        assert_eq!(lattice.pixel_to_point(&Pixel(2, 1)), Complex::new(0.0, 0.0));
        assert_eq!(lattice.pixel_to_point(&Pixel(4, 2)), Complex::new(2.0, 1.0));
        assert_eq!(lattice.pixel_to_point(&Pixel(1, 0)), Complex::new(-1.0, -1.0));
    }

    #[test]
    fn single_sample_sits_on_lower_bound() {
        let axis = Axis::new(-3.0, 7.0, 1);
        assert_eq!(axis.at(0), -3.0);
        let lattice = Lattice::new(viewport(1, 1)).unwrap();
        assert_eq!(lattice.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -1.0));
    }

    #[test]
    fn offsets_are_column_major() {
        let lattice = Lattice::new(viewport(4, 3)).unwrap();
        assert_eq!(lattice.offset(&Pixel(0, 0)), 0);
        assert_eq!(lattice.offset(&Pixel(0, 2)), 2);
        assert_eq!(lattice.offset(&Pixel(1, 0)), 3);
        assert_eq!(lattice.offset(&Pixel(3, 2)), 11);
        assert_eq!(lattice.len(), 12);
    }
}
