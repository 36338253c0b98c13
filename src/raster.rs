// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a normalized grid into pixels and pixels into a file.
//!
//! The grid is indexed `(x, y)` with y running up the imaginary axis;
//! an image is indexed by row with y running down the screen.  The
//! grid is therefore rotated a quarter turn counter-clockwise on the
//! way out, so that column `i` of the grid becomes column `i` of the
//! image and row `j` becomes row `height - 1 - j`.

use image::png::PNGEncoder;
use image::{ColorType, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::palettes::Palette;
use crate::sampler::NormalizedGrid;

/// An 8-bit RGB image.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    image: RgbImage,
}

impl Raster {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The pixel at column `x`, row `y`, counting rows from the top.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Borrows the underlying image buffer.
    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// Gives up the underlying image buffer.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Writes the image as an 8-bit RGB PNG, whatever the extension of
    /// `path` says.
    pub fn write_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let output = BufWriter::new(File::create(path)?);
        let encoder = PNGEncoder::new(output);
        encoder.encode(&self.image, self.width(), self.height(), ColorType::RGB(8))?;
        debug!(path = %path.display(), "wrote image");
        Ok(())
    }
}

/// Colors every entry of the grid with `palette` and lays the result
/// out in screen orientation.
pub fn colorize(grid: &NormalizedGrid, palette: Palette) -> Raster {
    let colormap = palette.colormap();
    let (width, height) = (grid.width(), grid.height());

    let artifacts = grid.non_finite();
    if artifacts > 0 {
        warn!(
            count = artifacts,
            palette = palette.name(),
            "non-finite values colored at the low end of the palette"
        );
    }

    let mut image = RgbImage::new(width as u32, height as u32);
    for (i, j) in iproduct!(0..width, 0..height) {
        let rgb = colormap.rgb8(grid.get(i, j));
        image.put_pixel(i as u32, (height - 1 - j) as u32, Rgb(rgb));
    }
    Raster { image }
}
