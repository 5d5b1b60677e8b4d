//! Pipeline module for orchestrating terrain generation stages.
//!
//! Provides a trait-based architecture for modular generation stages
//! that can be composed into a noise, smoothing and erosion run.

mod stage;

pub use stage::{
    ErosionStage, GenerationStage, HeightmapStage, Pipeline, PipelineError, PipelineReport,
    SmoothingStage, StageConfig, StageId, StageReport,
};
