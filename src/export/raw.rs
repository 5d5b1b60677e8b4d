//! RAW sample dump of a heightfield for mesh and render tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::terrain::Heightfield;

/// Errors that can occur during RAW export.
#[derive(Error, Debug)]
pub enum RawExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f64, f64),
}

/// RAW export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian.
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian (unnormalized).
    R32Float,
}

impl RawFormat {
    pub fn bytes_per_sample(&self) -> u64 {
        match self {
            RawFormat::R16LittleEndian | RawFormat::R16BigEndian => 2,
            RawFormat::R32Float => 4,
        }
    }
}

/// Options for RAW export.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExportOptions {
    pub format: RawFormat,
    /// Height mapped to 0 (R16 only).
    pub min_height: f64,
    /// Height mapped to 65535 (R16 only).
    pub max_height: f64,
}

impl Default for RawExportOptions {
    fn default() -> Self {
        Self {
            format: RawFormat::R16LittleEndian,
            min_height: -1.0,
            max_height: 1.0,
        }
    }
}

impl RawExportOptions {
    /// Normalizes over the grid's own height range.
    ///
    /// A flat grid gets a unit-wide range so R16 export stays valid.
    pub fn fit(grid: &Heightfield, format: RawFormat) -> Self {
        let (min, max) = grid.height_range();
        let max = if max > min { max } else { min + 1.0 };
        Self {
            format,
            min_height: min,
            max_height: max,
        }
    }
}

/// Writes every sample of `grid` in row-major order to `writer`.
pub fn write_raw<W: Write>(
    grid: &Heightfield,
    writer: &mut W,
    options: &RawExportOptions,
) -> Result<(), RawExportError> {
    let (min_height, max_height) = (options.min_height, options.max_height);
    if options.format != RawFormat::R32Float && !(min_height < max_height) {
        return Err(RawExportError::InvalidHeightRange(min_height, max_height));
    }

    let range = max_height - min_height;
    let quantize = |height: f64| {
        let normalized = ((height - min_height) / range).max(0.0).min(1.0);
        (normalized * 65535.0).round() as u16
    };

    match options.format {
        RawFormat::R16LittleEndian => {
            for &height in grid.heights() {
                writer.write_all(&quantize(height).to_le_bytes())?;
            }
        }
        RawFormat::R16BigEndian => {
            for &height in grid.heights() {
                writer.write_all(&quantize(height).to_be_bytes())?;
            }
        }
        RawFormat::R32Float => {
            for &height in grid.heights() {
                writer.write_all(&(height as f32).to_le_bytes())?;
            }
        }
    }

    Ok(())
}

/// Exports `grid` as a RAW heightmap file at `path`.
pub fn export_raw(
    grid: &Heightfield,
    path: &Path,
    options: &RawExportOptions,
) -> Result<(), RawExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_raw(grid, &mut writer, options)?;
    writer.flush()?;

    info!(
        path = %path.display(),
        size = grid.size(),
        format = ?options.format,
        "wrote raw heightmap"
    );
    Ok(())
}

/// Returns the expected file size for a RAW export.
pub fn expected_file_size(size: usize, format: RawFormat) -> u64 {
    let samples = (size as u64) * (size as u64);
    samples * format.bytes_per_sample()
}
