//! Procedural heightfield generator with droplet hydraulic erosion.
//!
//! Terrain is built in three steps: seeded fractal simplex noise fills a
//! square [`Heightfield`], pointwise smoothing remaps shape its elevation
//! profile, and thousands of simulated water droplets carve and deposit
//! sediment across it.

pub mod cancel;
pub mod erosion;
pub mod error;
pub mod export;
pub mod noise;
pub mod pipeline;
pub mod terrain;

pub use cancel::{CancellationToken, Cancelled};
pub use erosion::{DropletReport, ErosionEngine, ErosionParams, ErosionStats, Termination};
pub use error::ConfigError;
pub use noise::{generate_heightfield, FractalAccumulator, FractalNoiseConfig, NoiseField};
pub use pipeline::{
    ErosionStage, GenerationStage, HeightmapStage, Pipeline, PipelineError, SmoothingStage, StageConfig,
};
pub use terrain::{Heightfield, SmoothingChain, SmoothingOp};
