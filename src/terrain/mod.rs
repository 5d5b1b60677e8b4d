//! Terrain data and the operations shared by generation and erosion.
//!
//! Provides the [`Heightfield`] grid, continuous sampling over it, and the
//! smoothing remaps applied between noise generation and erosion.

mod heightfield;
pub mod sampler;
mod smoothing;

pub use heightfield::{ClampReport, Heightfield};
pub use sampler::{bilinear_footprint, gradient, interpolate_height, CellWeight, Footprint};
pub use smoothing::{cliff, great_plains, molone, plateau, SmoothingChain, SmoothingOp};
