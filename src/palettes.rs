// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The fixed set of palettes: continuous functions from [0, 1] to RGB.
//!
//! The perceptually uniform maps come straight from `colorgrad`.  The
//! rest are the classic segmented and functional colormaps, written
//! out as per-channel tables of `(x, y)` breakpoints with linear
//! interpolation between them, or as per-channel functions of x.

use colorgrad::Gradient;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::curves::fold_name;

/// Piecewise-linear channel tables.  Each channel lists `(x, y)`
/// breakpoints with x running from exactly 0 to exactly 1.
pub struct Segments {
    red: &'static [(f64, f64)],
    green: &'static [(f64, f64)],
    blue: &'static [(f64, f64)],
}

fn interpolate(table: &[(f64, f64)], t: f64) -> f64 {
    for pair in table.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if t <= x1 {
            if x1 <= x0 {
                return y1;
            }
            return y0 + (t - x0) / (x1 - x0) * (y1 - y0);
        }
    }
    table[table.len() - 1].1
}

impl Segments {
    fn at(&self, t: f64) -> [f64; 3] {
        [
            interpolate(self.red, t),
            interpolate(self.green, t),
            interpolate(self.blue, t),
        ]
    }
}

/// Evenly spaced colors, given as `0xRRGGBB`, blended linearly.  The
/// blend is done on the 0-255 scale so that the stops themselves come
/// back exactly.
fn ramp(stops: &[u32], t: f64) -> [f64; 3] {
    let channel = |hex: u32, shift: u32| f64::from((hex >> shift) & 0xff);
    let span = (stops.len() - 1) as f64;
    let position = t * span;
    let k = (position.floor() as usize).min(stops.len() - 2);
    let frac = position - k as f64;
    let (a, b) = (stops[k], stops[k + 1]);
    let mut rgb = [0.0; 3];
    for (c, shift) in [16u32, 8, 0].iter().enumerate() {
        let (lo, hi) = (channel(a, *shift), channel(b, *shift));
        rgb[c] = (lo + (hi - lo) * frac) / 255.0;
    }
    rgb
}

const NIPY_SPECTRAL: Segments = Segments {
    red: &[
        (0.0, 0.0), (0.05, 0.4667), (0.10, 0.5333), (0.15, 0.0), (0.20, 0.0),
        (0.25, 0.0), (0.30, 0.0), (0.35, 0.0), (0.40, 0.0), (0.45, 0.0),
        (0.50, 0.0), (0.55, 0.0), (0.60, 0.0), (0.65, 0.7333), (0.70, 0.9333),
        (0.75, 1.0), (0.80, 1.0), (0.85, 1.0), (0.90, 0.8667), (0.95, 0.80),
        (1.0, 0.80),
    ],
    green: &[
        (0.0, 0.0), (0.05, 0.0), (0.10, 0.0), (0.15, 0.0), (0.20, 0.0),
        (0.25, 0.4667), (0.30, 0.6000), (0.35, 0.6667), (0.40, 0.6667), (0.45, 0.6000),
        (0.50, 0.7333), (0.55, 0.8667), (0.60, 1.0), (0.65, 1.0), (0.70, 0.9333),
        (0.75, 0.8000), (0.80, 0.6000), (0.85, 0.0), (0.90, 0.0), (0.95, 0.0),
        (1.0, 0.80),
    ],
    blue: &[
        (0.0, 0.0), (0.05, 0.5333), (0.10, 0.6000), (0.15, 0.6667), (0.20, 0.8667),
        (0.25, 0.8667), (0.30, 0.8667), (0.35, 0.6667), (0.40, 0.5333), (0.45, 0.0),
        (0.50, 0.0), (0.55, 0.0), (0.60, 0.0), (0.65, 0.0), (0.70, 0.0),
        (0.75, 0.0), (0.80, 0.0), (0.85, 0.0), (0.90, 0.0), (0.95, 0.0),
        (1.0, 0.80),
    ],
};

const SEISMIC: Segments = Segments {
    red: &[(0.0, 0.0), (0.25, 0.0), (0.5, 1.0), (0.75, 1.0), (1.0, 0.5)],
    green: &[(0.0, 0.0), (0.25, 0.0), (0.5, 1.0), (0.75, 0.0), (1.0, 0.0)],
    blue: &[(0.0, 0.3), (0.25, 1.0), (0.5, 1.0), (0.75, 0.0), (1.0, 0.0)],
};

const HSV: Segments = Segments {
    red: &[
        (0.0, 1.0), (0.158730, 1.0), (0.174603, 0.968750), (0.333333, 0.031250),
        (0.349206, 0.0), (0.666667, 0.0), (0.682540, 0.031250), (0.841270, 0.968750),
        (0.857143, 1.0), (1.0, 1.0),
    ],
    green: &[
        (0.0, 0.0), (0.158730, 0.937500), (0.174603, 1.0), (0.507937, 1.0),
        (0.666667, 0.062500), (0.682540, 0.0), (1.0, 0.0),
    ],
    blue: &[
        (0.0, 0.0), (0.333333, 0.0), (0.349206, 0.062500), (0.507937, 1.0),
        (0.841270, 1.0), (0.857143, 0.937500), (1.0, 0.09375),
    ],
};

const GIST_RAINBOW: Segments = Segments {
    red: &[
        (0.0, 1.0), (0.030, 1.0), (0.215, 1.0), (0.400, 0.0),
        (0.586, 0.0), (0.770, 0.0), (0.954, 1.0), (1.0, 1.0),
    ],
    green: &[
        (0.0, 0.0), (0.030, 0.0), (0.215, 1.0), (0.400, 1.0),
        (0.586, 1.0), (0.770, 0.0), (0.954, 0.0), (1.0, 0.0),
    ],
    blue: &[
        (0.0, 0.16), (0.030, 0.0), (0.215, 0.0), (0.400, 0.0),
        (0.586, 1.0), (0.770, 1.0), (0.954, 1.0), (1.0, 0.75),
    ],
};

const GIST_GRAY: Segments = Segments {
    red: &[(0.0, 0.0), (1.0, 1.0)],
    green: &[(0.0, 0.0), (1.0, 1.0)],
    blue: &[(0.0, 0.0), (1.0, 1.0)],
};

const COPPER: Segments = Segments {
    red: &[(0.0, 0.0), (0.809524, 1.0), (1.0, 1.0)],
    green: &[(0.0, 0.0), (1.0, 0.7812)],
    blue: &[(0.0, 0.0), (1.0, 0.4975)],
};

const WINTER: Segments = Segments {
    red: &[(0.0, 0.0), (1.0, 0.0)],
    green: &[(0.0, 0.0), (1.0, 1.0)],
    blue: &[(0.0, 1.0), (1.0, 0.5)],
};

const COOL: Segments = Segments {
    red: &[(0.0, 0.0), (1.0, 1.0)],
    green: &[(0.0, 1.0), (1.0, 0.0)],
    blue: &[(0.0, 1.0), (1.0, 1.0)],
};

const GREYS: [u32; 9] = [
    0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000,
];

const BLUES: [u32; 9] = [
    0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c, 0x08306b,
];

const REDS: [u32; 9] = [
    0xfff5f0, 0xfee0d2, 0xfcbba1, 0xfc9272, 0xfb6a4a, 0xef3b2c, 0xcb181d, 0xa50f15, 0x67000d,
];

fn clip(v: f64) -> f64 {
    v.max(0.0).min(1.0)
}

fn flag(t: f64) -> [f64; 3] {
    [
        clip(0.75 * ((t * 31.5 + 0.25) * PI).sin() + 0.5),
        clip((t * 31.5 * PI).sin()),
        clip(0.75 * ((t * 31.5 - 0.25) * PI).sin() + 0.5),
    ]
}

fn prism(t: f64) -> [f64; 3] {
    [
        clip(0.75 * ((t * 20.9 + 0.25) * PI).sin() + 0.67),
        clip(0.75 * ((t * 20.9 - 0.25) * PI).sin() + 0.33),
        clip(-1.1 * (t * 20.9 * PI).sin()),
    ]
}

/// A palette ready to be sampled.
pub enum Colormap {
    /// A `colorgrad` preset.
    Sampled(Gradient),
    /// Per-channel breakpoint tables.
    Segmented(&'static Segments),
    /// Evenly spaced colors.
    Ramp(&'static [u32]),
    /// Per-channel functions of x.
    Functional(fn(f64) -> [f64; 3]),
}

impl Colormap {
    /// The color at `t`, with each channel in [0, 1].  `t` is clamped
    /// to [0, 1] first, and NaN is treated as 0.
    pub fn at(&self, t: f64) -> [f64; 3] {
        let t = if t.is_nan() { 0.0 } else { clip(t) };
        match self {
            Colormap::Sampled(gradient) => {
                let c = gradient.at(t);
                [clip(c.r), clip(c.g), clip(c.b)]
            }
            Colormap::Segmented(segments) => segments.at(t),
            Colormap::Ramp(stops) => ramp(stops, t),
            Colormap::Functional(f) => f(t),
        }
    }

    /// The color at `t` as 8-bit channels, truncating `v·255`.
    pub fn rgb8(&self, t: f64) -> [u8; 3] {
        let [r, g, b] = self.at(t);
        [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
    }
}

/// The fixed set of palettes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Palette {
    /// Blue through magenta to yellow.
    Plasma,
    /// Black through red to pale yellow.
    Inferno,
    /// The many-hued "nipy spectral" map, black through to light grey.
    Spectral,
    /// Dark blue through white to dark red.
    Seismic,
    /// A full trip around the hue circle.
    Hsv,
    /// Rapidly repeating red-yellow-green-blue-violet bands.
    Prism,
    /// The "gist rainbow" map, red through violet.
    Rainbow,
    /// Rapidly repeating red-white-blue-black bands.
    Flag,
    /// Black to white.
    GreysInverted,
    /// Purple through teal to yellow.
    Viridis,
    /// Black through purple to pale peach.
    Magma,
    /// Navy to yellow, readable with color-vision deficiency.
    Cividis,
    /// White to black.
    Greys,
    /// Pale to deep blue.
    Blues,
    /// Pale to deep red.
    Reds,
    /// Black to copper.
    Copper,
    /// Blue to green.
    Winter,
    /// Cyan to magenta.
    Cool,
}

/// Every palette, in menu order.
pub const PALETTES: [Palette; 18] = [
    Palette::Plasma,
    Palette::Inferno,
    Palette::Spectral,
    Palette::Seismic,
    Palette::Hsv,
    Palette::Prism,
    Palette::Rainbow,
    Palette::Flag,
    Palette::GreysInverted,
    Palette::Viridis,
    Palette::Magma,
    Palette::Cividis,
    Palette::Greys,
    Palette::Blues,
    Palette::Reds,
    Palette::Copper,
    Palette::Winter,
    Palette::Cool,
];

impl Palette {
    /// The display name of the palette.
    pub fn name(self) -> &'static str {
        match self {
            Palette::Plasma => "Plasma",
            Palette::Inferno => "Inferno",
            Palette::Spectral => "Spectral",
            Palette::Seismic => "Seismic",
            Palette::Hsv => "HSV",
            Palette::Prism => "Prism",
            Palette::Rainbow => "Rainbow",
            Palette::Flag => "Flag",
            Palette::GreysInverted => "Greys inverted",
            Palette::Viridis => "Viridis",
            Palette::Magma => "Magma",
            Palette::Cividis => "Cividis",
            Palette::Greys => "Greys",
            Palette::Blues => "Blues",
            Palette::Reds => "Reds",
            Palette::Copper => "Copper",
            Palette::Winter => "Winter",
            Palette::Cool => "Cool",
        }
    }

    /// Builds the colormap behind this palette.
    pub fn colormap(self) -> Colormap {
        match self {
            Palette::Plasma => Colormap::Sampled(colorgrad::plasma()),
            Palette::Inferno => Colormap::Sampled(colorgrad::inferno()),
            Palette::Viridis => Colormap::Sampled(colorgrad::viridis()),
            Palette::Magma => Colormap::Sampled(colorgrad::magma()),
            Palette::Cividis => Colormap::Sampled(colorgrad::cividis()),
            Palette::Spectral => Colormap::Segmented(&NIPY_SPECTRAL),
            Palette::Seismic => Colormap::Segmented(&SEISMIC),
            Palette::Hsv => Colormap::Segmented(&HSV),
            Palette::Rainbow => Colormap::Segmented(&GIST_RAINBOW),
            Palette::GreysInverted => Colormap::Segmented(&GIST_GRAY),
            Palette::Copper => Colormap::Segmented(&COPPER),
            Palette::Winter => Colormap::Segmented(&WINTER),
            Palette::Cool => Colormap::Segmented(&COOL),
            Palette::Greys => Colormap::Ramp(&GREYS),
            Palette::Blues => Colormap::Ramp(&BLUES),
            Palette::Reds => Colormap::Ramp(&REDS),
            Palette::Prism => Colormap::Functional(prism),
            Palette::Flag => Colormap::Functional(flag),
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Palette, String> {
        let wanted = fold_name(s);
        PALETTES
            .iter()
            .cloned()
            .find(|palette| fold_name(palette.name()) == wanted)
            .ok_or_else(|| format!("unknown palette '{}'", s))
    }
}
