//! Multi-octave fractal Brownian motion (fBm) over a [`NoiseField`].

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::simplex::NoiseField;
use crate::cancel::{CancellationToken, Cancelled};
use crate::error::{self, ConfigError};
use crate::terrain::Heightfield;

/// Octaves past this contribute amplitudes below `f64` resolution.
pub const MAX_OCTAVES: u32 = 64;

/// Configuration for multi-octave fractal noise generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalNoiseConfig {
    /// Seed for the permutation table.
    pub seed: u64,
    /// Grid coordinates are divided by this before sampling (larger = smoother).
    pub scale: f64,
    /// Number of noise octaves.
    pub octaves: u32,
    /// Amplitude decay per octave.
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 2048.0,
            octaves: 12,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl FractalNoiseConfig {
    /// Creates a new noise configuration with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// A small, quick configuration: 4 octaves at scale 64.
    pub fn preview(seed: u64) -> Self {
        Self {
            seed,
            scale: 64.0,
            octaves: 4,
            ..Default::default()
        }
    }

    /// Checks every field; called by [`FractalAccumulator::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.octaves < 1 || self.octaves > MAX_OCTAVES {
            return Err(ConfigError::Octaves(self.octaves));
        }
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(ConfigError::Scale(self.scale));
        }
        error::positive("persistence", self.persistence)?;
        error::positive("lacunarity", self.lacunarity)?;
        Ok(())
    }
}

/// Sums octaves of one [`NoiseField`] into a normalized elevation.
///
/// Octave frequencies and amplitudes are precomputed once; sampling is
/// read-only, so a single accumulator can be shared across threads.
#[derive(Debug, Clone)]
pub struct FractalAccumulator {
    noise: NoiseField,
    scale: f64,
    frequencies: Vec<f64>,
    amplitudes: Vec<f64>,
    amplitude_sum: f64,
}

impl FractalAccumulator {
    pub fn new(config: &FractalNoiseConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut frequencies = Vec::with_capacity(config.octaves as usize);
        let mut amplitudes = Vec::with_capacity(config.octaves as usize);
        for octave in 0..config.octaves {
            frequencies.push(config.lacunarity.powi(octave as i32));
            amplitudes.push(config.persistence.powi(octave as i32));
        }
        let amplitude_sum = amplitudes.iter().sum();

        Ok(Self {
            noise: NoiseField::new(config.seed),
            scale: config.scale,
            frequencies,
            amplitudes,
            amplitude_sum,
        })
    }

    /// The underlying single-octave field.
    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    pub fn octaves(&self) -> usize {
        self.frequencies.len()
    }

    /// Normalized fBm value at grid coordinate `(x, y)`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let nx = x / self.scale;
        let ny = y / self.scale;

        let total: f64 = self
            .frequencies
            .iter()
            .zip(&self.amplitudes)
            .map(|(&freq, &amp)| self.noise.eval2(nx * freq, ny * freq) * amp)
            .sum();

        total / self.amplitude_sum
    }

    /// Overwrites every cell of `grid` with the fBm value at its coordinate.
    ///
    /// Rows are filled in parallel; each row only reads the immutable
    /// permutation table.
    pub fn fill(&self, grid: &mut Heightfield) {
        let size = grid.size();
        grid.heights_mut()
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(y, row)| self.fill_row(y, row));
    }

    /// Like [`fill`](Self::fill), but checks `cancel` before each row.
    ///
    /// On cancellation the grid is left partially written.
    pub fn fill_cancellable(
        &self,
        grid: &mut Heightfield,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let size = grid.size();
        grid.heights_mut()
            .par_chunks_mut(size)
            .enumerate()
            .try_for_each(|(y, row)| {
                cancel.check()?;
                self.fill_row(y, row);
                Ok(())
            })
    }

    /// Allocates a `size × size` grid and fills it.
    pub fn generate(&self, size: usize) -> Result<Heightfield, ConfigError> {
        let mut grid = Heightfield::new(size)?;
        self.fill(&mut grid);
        Ok(grid)
    }

    fn fill_row(&self, y: usize, row: &mut [f64]) {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = self.sample(x as f64, y as f64);
        }
    }
}

/// Generates a `size × size` heightfield from `config`.
///
/// Validates the configuration before touching any memory.
pub fn generate_heightfield(
    config: &FractalNoiseConfig,
    size: usize,
) -> Result<Heightfield, ConfigError> {
    let start = Instant::now();
    let accumulator = FractalAccumulator::new(config)?;
    debug!(octaves = accumulator.octaves(), "precomputed octave table");

    let grid = accumulator.generate(size)?;
    let (min, max) = grid.height_range();
    info!(
        size,
        scale = config.scale,
        octaves = config.octaves,
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        min,
        max,
        "generated noise heightfield"
    );
    Ok(grid)
}
