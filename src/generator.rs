// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The request pipeline: expression and viewport in, image file out.
//!
//! The expensive part of a request is sampling.  A `Fractal` holds on
//! to its raw grid so that choosing another curve or palette only
//! repeats the cheap stages, and a `Generator` keeps the last fractal
//! it made for exactly that purpose.  `Generator::spawn` runs a whole
//! request on a background thread and reports on it through a channel.

use crossbeam::channel::{unbounded, Receiver};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, info};

use crate::curves::{normalize, Curve};
use crate::error::Result;
use crate::palettes::Palette;
use crate::planes::{Lattice, Viewport};
use crate::polynomial::{compile, CoefficientTable, Polynomial};
use crate::raster::{colorize, Raster};
use crate::sampler::{sample_with, Control, NormalizedGrid, RawGrid};

/// A sampled fractal, ready to be colored any number of ways.
#[derive(Debug)]
pub struct Fractal {
    polynomial: Polynomial,
    raw: RawGrid,
    viewport: Viewport,
    elapsed: Duration,
}

impl Fractal {
    /// Compiles `expression` and samples it over `viewport` on
    /// `threads` threads.
    pub fn compute(expression: &str, viewport: Viewport, threads: usize) -> Result<Fractal> {
        Fractal::compute_with(expression, viewport, &Control::with_threads(threads))
    }

    /// As `compute`, with cancellation and progress reporting.
    ///
    /// The viewport is checked before the expression is compiled and
    /// both are checked before any point is sampled.  Only sampling is
    /// timed.
    pub fn compute_with(expression: &str, viewport: Viewport, control: &Control) -> Result<Fractal> {
        let _span = debug_span!("compute", expression).entered();
        viewport.validate()?;
        let polynomial = compile(expression)?;
        info!(
            z_degree = polynomial.table().z_degree(),
            c_degree = polynomial.table().c_degree(),
            "compiled expression"
        );

        let lattice = Lattice::new(viewport)?;
        let start = Instant::now();
        let raw = sample_with(&lattice, &polynomial, control)?;
        let elapsed = start.elapsed();
        info!(
            width = viewport.width,
            height = viewport.height,
            max_iter = viewport.max_iter,
            seconds = elapsed.as_secs_f64(),
            "sampled lattice"
        );

        Ok(Fractal {
            polynomial,
            raw,
            viewport,
            elapsed,
        })
    }

    /// The expression this fractal was compiled from.
    pub fn expression(&self) -> &str {
        self.polynomial.source()
    }

    /// Coefficients of the compiled map.
    pub fn table(&self) -> &CoefficientTable {
        self.polynomial.table()
    }

    /// Escape times divided by the iteration limit.
    pub fn raw(&self) -> &RawGrid {
        &self.raw
    }

    /// The viewport that was sampled.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Wall time spent sampling.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The raw grid passed through `curve`.
    pub fn normalize(&self, curve: Curve) -> NormalizedGrid {
        normalize(&self.raw, self.viewport.max_iter, curve)
    }

    /// Colors the fractal without sampling it again.
    pub fn render(&self, curve: Curve, palette: Palette) -> Raster {
        let _span = debug_span!("render", curve = curve.name(), palette = palette.name()).entered();
        colorize(&self.normalize(curve), palette)
    }

    fn matches(&self, request: &Request) -> bool {
        self.expression() == request.expression && self.viewport == request.viewport
    }
}

/// Everything needed to turn an expression into an image file.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// The map, as a polynomial in z and c.
    pub expression: String,
    /// Region, image size and iteration limit.
    pub viewport: Viewport,
    /// Curve applied before coloring.
    pub curve: Curve,
    /// Palette used for coloring.
    pub palette: Palette,
    /// Sampling threads.
    pub threads: usize,
    /// Where the PNG goes.
    pub output: PathBuf,
}

impl Request {
    /// A request for `expression` over the default view, colored with
    /// Inferno through the Autolog curve on every available core.
    pub fn new<P: AsRef<Path>>(expression: &str, output: P) -> Request {
        Request {
            expression: expression.to_string(),
            viewport: Viewport::default(),
            curve: Curve::Autolog,
            palette: Palette::Inferno,
            threads: num_cpus::get(),
            output: output.as_ref().to_path_buf(),
        }
    }
}

/// What a finished request produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Wall time spent sampling.
    pub elapsed: Duration,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Degree of the map in z.
    pub z_degree: usize,
    /// Highest degree of c among the coefficients.
    pub c_degree: usize,
    /// Pixels whose value was NaN or infinite after the curve.
    pub non_finite: usize,
    /// True when the raw grid of an earlier request was reused.
    pub reused: bool,
}

fn finish(fractal: &Fractal, request: &Request, reused: bool) -> Result<Report> {
    let normalized = fractal.normalize(request.curve);
    let raster = colorize(&normalized, request.palette);
    raster.write_png(&request.output)?;
    info!(
        output = %request.output.display(),
        curve = request.curve.name(),
        palette = request.palette.name(),
        reused,
        "wrote image"
    );
    Ok(Report {
        elapsed: fractal.elapsed(),
        width: raster.width(),
        height: raster.height(),
        z_degree: fractal.table().z_degree(),
        c_degree: fractal.table().c_degree(),
        non_finite: normalized.non_finite(),
        reused,
    })
}

/// Runs a request start to finish.
pub fn generate(request: &Request) -> Result<Report> {
    generate_with(request, &Control::with_threads(request.threads))
}

/// Runs a request under the given control.  The thread count in
/// `control` wins over the one in the request.
pub fn generate_with(request: &Request, control: &Control) -> Result<Report> {
    let fractal = Fractal::compute_with(&request.expression, request.viewport, control)?;
    finish(&fractal, request, false)
}

/// Progress of a spawned request.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The background thread has picked up the request.
    Started,
    /// `done` of `total` columns have been sampled.
    Progress {
        /// Columns finished so far.
        done: usize,
        /// Columns in the image.
        total: usize,
    },
    /// The image was written.
    Finished {
        /// Wall time spent sampling.
        elapsed: Duration,
    },
    /// The request failed or was cancelled.
    Failed {
        /// The error, as text.
        message: String,
    },
}

/// A request running on a background thread.
#[derive(Debug)]
pub struct Job {
    events: Receiver<Event>,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<Result<Report>>,
}

impl Job {
    /// The stream of events.  It ends after `Finished` or `Failed`.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Asks the job to stop.  Sampling stops at the next column and
    /// the job fails with `Cancelled`; a job past sampling finishes.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Blocks until the job is done.
    pub fn wait(self) -> Result<Report> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Runs requests, keeping the last sampled fractal around so that a
/// request differing only in curve or palette skips sampling.
#[derive(Debug, Default)]
pub struct Generator {
    last: Option<Fractal>,
}

impl Generator {
    /// A generator with nothing cached.
    pub fn new() -> Generator {
        Generator::default()
    }

    /// The most recently sampled fractal.
    pub fn last(&self) -> Option<&Fractal> {
        self.last.as_ref()
    }

    /// Runs a request, reusing the cached raw grid when the expression
    /// and viewport are unchanged.  A request that fails to compile or
    /// sample leaves the cache as it was; once sampling succeeds the
    /// grid is cached, even if the image then cannot be written.
    pub fn run(&mut self, request: &Request) -> Result<Report> {
        if let Some(fractal) = self.last.as_ref().filter(|f| f.matches(request)) {
            debug!("reusing sampled grid");
            return finish(fractal, request, true);
        }
        let fractal = Fractal::compute(&request.expression, request.viewport, request.threads)?;
        let fractal = self.last.insert(fractal);
        finish(fractal, request, false)
    }

    /// Runs a request on a new thread.
    pub fn spawn(request: Request) -> Job {
        let (events_tx, events) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();

        let handle = thread::spawn(move || {
            let _ = events_tx.send(Event::Started);

            let (progress_tx, progress_rx) = unbounded();
            let forward = events_tx.clone();
            let relay = thread::spawn(move || {
                for (done, total) in progress_rx {
                    let _ = forward.send(Event::Progress { done, total });
                }
            });

            let control = Control {
                threads: request.threads,
                cancel: flag,
                progress: Some(progress_tx),
            };
            let result = generate_with(&request, &control);
            drop(control);
            let _ = relay.join();

            let last = match &result {
                Ok(report) => Event::Finished {
                    elapsed: report.elapsed,
                },
                Err(e) => Event::Failed {
                    message: e.to_string(),
                },
            };
            let _ = events_tx.send(last);
            result
        });

        Job {
            events,
            cancel,
            handle,
        }
    }
}
