//! Square, row-major elevation grid.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A `size × size` grid of elevations stored in row-major order.
///
/// The dimensions are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    size: usize,
    heights: Vec<f64>,
}

/// Counts of cells changed by [`Heightfield::clamp`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampReport {
    /// Cells that were above the upper bound.
    pub above: usize,
    /// Cells that were below the lower bound.
    pub below: usize,
}

impl ClampReport {
    pub fn total(&self) -> usize {
        self.above + self.below
    }
}

impl Heightfield {
    /// Creates a flat grid with every height set to 0.0.
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        Self::filled(size, 0.0)
    }

    /// Creates a grid with every height set to `value`.
    pub fn filled(size: usize, value: f64) -> Result<Self, ConfigError> {
        if size < 1 {
            return Err(ConfigError::GridSize(size));
        }
        Ok(Self {
            size,
            heights: vec![value; size * size],
        })
    }

    /// Wraps existing row-major samples.
    pub fn from_vec(size: usize, heights: Vec<f64>) -> Result<Self, ConfigError> {
        if size < 1 {
            return Err(ConfigError::GridSize(size));
        }
        if heights.len() != size * size {
            return Err(ConfigError::GridLength {
                expected: size * size,
                actual: heights.len(),
            });
        }
        Ok(Self { size, heights })
    }

    /// Builds a grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn<F>(size: usize, f: F) -> Result<Self, ConfigError>
    where
        F: Fn(usize, usize) -> f64,
    {
        let mut grid = Self::new(size)?;
        for y in 0..size {
            for x in 0..size {
                grid.heights[y * size + x] = f(x, y);
            }
        }
        Ok(grid)
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size
    }

    pub fn height(&self) -> usize {
        self.size
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Linear index of cell `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    /// Height at cell `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.heights[self.index(x, y)]
    }

    /// Sets the height at cell `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        let idx = self.index(x, y);
        self.heights[idx] = value;
    }

    /// Row-major samples.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Mutable row-major samples. The length cannot change through a slice.
    pub fn heights_mut(&mut self) -> &mut [f64] {
        &mut self.heights
    }

    /// Consumes the grid and returns its row-major samples.
    pub fn into_vec(self) -> Vec<f64> {
        self.heights
    }

    /// Returns `(min, max)` over every cell.
    pub fn height_range(&self) -> (f64, f64) {
        self.heights
            .iter()
            .fold((f64::MAX, f64::MIN), |(min, max), &h| (min.min(h), max.max(h)))
    }

    /// Sum of every cell.
    pub fn total(&self) -> f64 {
        self.heights.iter().sum()
    }

    /// Mean cell height.
    pub fn mean(&self) -> f64 {
        self.total() / self.heights.len() as f64
    }

    /// Applies `f` to every cell in parallel.
    pub fn map_in_place<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64 + Sync,
    {
        self.heights.par_iter_mut().for_each(|h| *h = f(*h));
    }

    /// Multiplies every cell by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.map_in_place(|h| h * factor);
    }

    /// Clamps every cell into `[min, max]` and reports how many moved.
    pub fn clamp(&mut self, min: f64, max: f64) -> ClampReport {
        let mut report = ClampReport::default();
        for h in &mut self.heights {
            if *h > max {
                *h = max;
                report.above += 1;
            } else if *h < min {
                *h = min;
                report.below += 1;
            }
        }
        report
    }
}
