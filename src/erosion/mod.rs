//! Droplet-based hydraulic erosion.
//!
//! Each [`Droplet`] carries water and sediment downhill across a
//! [`Heightfield`](crate::terrain::Heightfield), picking up material where it
//! has spare capacity and dropping it where it has too much. The
//! [`ErosionEngine`] spawns droplets at random positions and runs them one
//! after another.

mod config;
mod droplet;
mod engine;
mod stats;

pub use config::ErosionParams;
pub use droplet::{Droplet, DropletState, StepTransfer, Termination};
pub use engine::{DropletReport, ErosionEngine};
pub use stats::{ErosionStats, TerminationCounts};
