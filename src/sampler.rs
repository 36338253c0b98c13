// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Samples the escape time over every point of a lattice.
//!
//! No point depends on any other, so the grid is handed out a column
//! at a time to a pool of scoped threads.  Each thread writes only to
//! the column it pulled from the queue, which means the result is
//! identical however many threads run and in whatever order they
//! finish.

use crossbeam::channel::Sender;
use std::iter::Enumerate;
use std::slice::ChunksMut;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, debug_span};

use crate::error::{FractalError, Result};
use crate::escape::escape_time;
use crate::planes::{Lattice, Pixel};
use crate::polynomial::Polynomial;

type ColumnQueue<'a> = Arc<Mutex<Enumerate<ChunksMut<'a, f64>>>>;

/// A `width × height` grid of real values stored column-major: entry
/// `(i, j)` belongs to the `i`th sample along the real axis and the
/// `j`th along the imaginary axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

/// Escape times scaled by the iteration limit, nominally in `[0, 1]`.
pub type RawGrid = Grid;

/// A raw grid after a curve has been applied to it.
pub type NormalizedGrid = Grid;

impl Grid {
    /// Wraps column-major values.  `values.len()` must be
    /// `width * height`.
    pub fn from_columns(width: usize, height: usize, values: Vec<f64>) -> Grid {
        assert_eq!(values.len(), width * height, "grid size mismatch");
        Grid {
            width,
            height,
            values,
        }
    }

    /// A grid with every entry set to `value`.
    pub fn filled(width: usize, height: usize, value: f64) -> Grid {
        Grid::from_columns(width, height, vec![value; width * height])
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Entry `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.height + j]
    }

    /// All entries, column-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Applies `f` to every entry, producing a grid of the same shape.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Grid {
        Grid {
            width: self.width,
            height: self.height,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// How many entries are NaN or infinite.
    pub fn non_finite(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }
}

/// Knobs for a sampling run beyond the lattice itself.
#[derive(Clone, Debug)]
pub struct Control {
    /// Number of worker threads; zero is treated as one.
    pub threads: usize,
    /// Set from another thread to abandon the run.
    pub cancel: Arc<AtomicBool>,
    /// Receives `(columns done, columns total)` as columns finish.
    pub progress: Option<Sender<(usize, usize)>>,
}

impl Control {
    /// A run on `threads` workers that cannot be cancelled and does
    /// not report progress.
    pub fn with_threads(threads: usize) -> Control {
        Control {
            threads,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }
}

impl Default for Control {
    fn default() -> Self {
        Control::with_threads(num_cpus::get())
    }
}

/// Fills one column of the grid.
fn sample_column(lattice: &Lattice, map: &Polynomial, column: usize, out: &mut [f64]) {
    let max_iter = lattice.viewport().max_iter;
    let scale = f64::from(max_iter);
    for (row, value) in out.iter_mut().enumerate() {
        let point = lattice.pixel_to_point(&Pixel(column, row));
        *value = escape_time(point, map, max_iter) / scale;
    }
}

/// Samples every point of the lattice on `threads` threads and
/// divides by the iteration limit.
pub fn sample(lattice: &Lattice, map: &Polynomial, threads: usize) -> RawGrid {
    let control = Control::with_threads(threads);
    match sample_with(lattice, map, &control) {
        Ok(grid) => grid,
        // Only a cancelled run fails, and nothing else holds this flag.
        Err(_) => unreachable!("uncancellable run was cancelled"),
    }
}

/// As `sample`, but honours the cancellation flag between columns and
/// reports progress.  A cancelled run returns `Cancelled` and the
/// partially filled grid is dropped.
pub fn sample_with(lattice: &Lattice, map: &Polynomial, control: &Control) -> Result<RawGrid> {
    let width = lattice.width();
    let height = lattice.height();
    let threads = control.threads.max(1).min(width);
    let _span = debug_span!("sample", width, height, threads).entered();

    let mut values = vec![0.0_f64; lattice.len()];
    let done = AtomicUsize::new(0);
    {
        let columns: ColumnQueue = Arc::new(Mutex::new(values.chunks_mut(height).enumerate()));
        let done = &done;
        let run = crossbeam::scope(|spawner| {
            for worker in 0..threads {
                let columns = columns.clone();
                spawner.spawn(move |_| {
                    let mut mine = 0;
                    loop {
                        if control.cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let column = { columns.lock().map(|mut queue| queue.next()) };
                        match column {
                            Ok(Some((index, out))) => {
                                sample_column(lattice, map, index, out);
                                mine += 1;
                                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                                if let Some(progress) = &control.progress {
                                    let _ = progress.send((finished, width));
                                }
                            }
                            // Queue exhausted, or poisoned by a panicking sibling.
                            _ => break,
                        }
                    }
                    debug!(worker, columns = mine, "worker finished");
                });
            }
        });
        if let Err(panic) = run {
            std::panic::resume_unwind(panic);
        }
    }

    if control.cancel.load(Ordering::Relaxed) && done.load(Ordering::Relaxed) < width {
        return Err(FractalError::Cancelled);
    }
    Ok(Grid::from_columns(width, height, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::Viewport;
    use crate::polynomial::compile;
    use crossbeam::channel::unbounded;

    fn small() -> Lattice {
        Lattice::new(Viewport {
            x_min: -2.0,
            x_max: 1.0,
            y_min: -1.25,
            y_max: 1.25,
            width: 31,
            height: 17,
            max_iter: 25,
        })
        .unwrap()
    }

    fn bits(grid: &Grid) -> Vec<u64> {
        grid.values().iter().map(|v| v.to_bits()).collect()
    }

    #[test]
    fn grid_is_column_major_and_scaled() {
        let lattice = small();
        let map = compile("z**2 + c").unwrap();
        let grid = sample(&lattice, &map, 1);
        assert_eq!((grid.width(), grid.height()), (31, 17));
        for &(i, j) in &[(0, 0), (5, 3), (30, 16), (12, 8)] {
            let point = lattice.pixel_to_point(&Pixel(i, j));
            let expected = escape_time(point, &map, 25) / 25.0;
            assert_eq!(grid.get(i, j).to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let lattice = small();
        let map = compile("z**3 - 0.5*c + I*0.1").unwrap();
        let one = sample(&lattice, &map, 1);
        let four = sample(&lattice, &map, 4);
        let many = sample(&lattice, &map, 64);
        assert_eq!(bits(&one), bits(&four));
        assert_eq!(bits(&one), bits(&many));
    }

    #[test]
    fn reports_progress_per_column() {
        let lattice = small();
        let map = compile("z**2 + c").unwrap();
        let (tx, rx) = unbounded();
        let control = Control {
            threads: 3,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: Some(tx),
        };
        sample_with(&lattice, &map, &control).unwrap();
        drop(control);
        let reports: Vec<(usize, usize)> = rx.iter().collect();
        assert_eq!(reports.len(), 31);
        assert!(reports.iter().all(|&(_, total)| total == 31));
        assert_eq!(reports.iter().map(|&(done, _)| done).max(), Some(31));
    }

    #[test]
    fn cancelled_run_returns_nothing() {
        let lattice = small();
        let map = compile("z**2 + c").unwrap();
        let control = Control::with_threads(2);
        control.cancel.store(true, Ordering::Relaxed);
        match sample_with(&lattice, &map, &control) {
            Err(FractalError::Cancelled) => {}
            other => panic!("expected cancellation, got {:?}", other),
        }
    }

    #[test]
    fn grid_map_keeps_shape() {
        let grid = Grid::filled(3, 2, 0.5);
        let doubled = grid.map(|v| v * 2.0);
        assert_eq!((doubled.width(), doubled.height()), (3, 2));
        assert!(doubled.values().iter().all(|&v| v == 1.0));
        assert_eq!(Grid::filled(2, 2, std::f64::NAN).non_finite(), 4);
    }
}
