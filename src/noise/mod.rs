//! Noise generation for terrain synthesis.
//!
//! A seeded simplex-style [`NoiseField`] is layered into octaves by the
//! [`FractalAccumulator`] to produce the initial heightfield.

mod fractal;
mod simplex;

pub use fractal::{generate_heightfield, FractalAccumulator, FractalNoiseConfig, MAX_OCTAVES};
pub use simplex::{NoiseField, PermutationTable, GRADIENTS};
