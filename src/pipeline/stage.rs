//! Generation stage trait and pipeline orchestration.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::cancel::{CancellationToken, Cancelled};
use crate::erosion::{ErosionEngine, ErosionParams, ErosionStats};
use crate::error::ConfigError;
use crate::noise::{FractalAccumulator, FractalNoiseConfig};
use crate::terrain::{ClampReport, Heightfield, SmoothingChain};

/// Unique identifier for generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Initial heightfield from fractal noise.
    Heightmap,
    /// Pointwise elevation remaps.
    Smoothing,
    /// Droplet hydraulic erosion.
    Erosion,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Heightmap => "heightmap",
            StageId::Smoothing => "smoothing",
            StageId::Erosion => "erosion",
        }
    }
}

/// Configuration passed to each generation stage.
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
    /// Noise configuration for terrain generation.
    pub noise: FractalNoiseConfig,
    /// Checked between stages and inside long-running ones.
    pub cancel: CancellationToken,
}

impl StageConfig {
    /// Creates a new configuration with the given noise settings.
    pub fn with_noise(noise: FractalNoiseConfig) -> Self {
        Self {
            noise,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token, usually with a clone held by the caller.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),
    #[error("Missing dependency: stage '{0}' requires '{1}'")]
    MissingDependency(String, String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// What a single stage did to the heightfield.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub id: StageId,
    pub name: String,
    pub elapsed: Duration,
    /// `(min, max)` after the stage ran.
    pub range: (f64, f64),
    /// Set by erosion stages.
    pub erosion: Option<ErosionStats>,
    /// Set when a stage clamped its output.
    pub clamp: Option<ClampReport>,
}

impl StageReport {
    fn new(id: StageId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            elapsed: Duration::ZERO,
            range: (0.0, 0.0),
            erosion: None,
            clamp: None,
        }
    }
}

/// Reports of every stage of one pipeline run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Report of the first stage with the given id.
    pub fn stage(&self, id: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Erosion statistics summed over every erosion stage.
    pub fn erosion(&self) -> Option<ErosionStats> {
        self.stages
            .iter()
            .filter_map(|s| s.erosion.as_ref())
            .fold(None, |acc: Option<ErosionStats>, stats| {
                let mut acc = acc.unwrap_or_default();
                acc.merge(stats);
                Some(acc)
            })
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }
}

/// Trait for implementing generation stages.
///
/// Each stage transforms the heightfield in place, building upon
/// previous stages.
pub trait GenerationStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Returns the stage IDs that must be executed before this stage.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Executes the generation stage, modifying the grid in place.
    ///
    /// The pipeline fills in timing and the final height range of the
    /// returned report.
    fn execute(&self, grid: &mut Heightfield, config: &StageConfig) -> Result<StageReport, PipelineError>;
}

/// Orchestrates multiple generation stages over one heightfield.
pub struct Pipeline {
    stages: Vec<Box<dyn GenerationStage>>,
    config: StageConfig,
}

impl Pipeline {
    /// Creates a new empty pipeline with the given configuration.
    pub fn new(config: StageConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: GenerationStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Executes all stages in order on the given grid.
    pub fn run(&self, grid: &mut Heightfield) -> Result<PipelineReport, PipelineError> {
        self.run_with_callbacks(grid, |_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages with progress callbacks.
    ///
    /// # Arguments
    /// * `grid` - The heightfield to generate
    /// * `on_stage_start` - Called when each stage begins
    /// * `on_stage_complete` - Called when each stage finishes
    pub fn run_with_callbacks<F1, F2>(
        &self,
        grid: &mut Heightfield,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<PipelineReport, PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::new();
        let mut report = PipelineReport::default();

        for (i, stage) in self.stages.iter().enumerate() {
            self.config.cancel.check()?;
            on_stage_start(stage.name(), i, total);

            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::MissingDependency(
                        stage.name().to_string(),
                        dep.name().to_string(),
                    ));
                }
            }

            let start = Instant::now();
            let mut stage_report = stage.execute(grid, &self.config)?;
            stage_report.elapsed = start.elapsed();
            stage_report.range = grid.height_range();
            debug!(
                stage = stage.id().name(),
                elapsed_ms = stage_report.elapsed.as_secs_f64() * 1e3,
                min = stage_report.range.0,
                max = stage_report.range.1,
                "stage complete"
            );

            completed.push(stage.id());
            report.stages.push(stage_report);

            on_stage_complete(stage.name(), i, total);
        }

        Ok(report)
    }
}

/// Heightmap generation stage using fractal noise.
pub struct HeightmapStage;

impl GenerationStage for HeightmapStage {
    fn id(&self) -> StageId {
        StageId::Heightmap
    }

    fn name(&self) -> &str {
        "Heightmap Generation"
    }

    fn execute(&self, grid: &mut Heightfield, config: &StageConfig) -> Result<StageReport, PipelineError> {
        let accumulator = FractalAccumulator::new(&config.noise)?;
        accumulator.fill_cancellable(grid, &config.cancel)?;
        Ok(StageReport::new(self.id(), self.name()))
    }
}

/// Applies a [`SmoothingChain`] to every cell.
pub struct SmoothingStage {
    pub chain: SmoothingChain,
}

impl SmoothingStage {
    pub fn new(chain: SmoothingChain) -> Self {
        Self { chain }
    }
}

impl GenerationStage for SmoothingStage {
    fn id(&self) -> StageId {
        StageId::Smoothing
    }

    fn name(&self) -> &str {
        "Smoothing"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Heightmap]
    }

    fn execute(&self, grid: &mut Heightfield, _config: &StageConfig) -> Result<StageReport, PipelineError> {
        self.chain.validate()?;
        self.chain.apply_to(grid);
        Ok(StageReport::new(self.id(), self.name()))
    }
}

/// Droplet erosion split into one or more passes sharing one spawn stream.
pub struct ErosionStage {
    pub params: ErosionParams,
    pub droplets: u64,
    pub seed: u64,
    pub passes: u32,
    /// Optional `(min, max)` applied after the last pass.
    pub clamp: Option<(f64, f64)>,
}

impl ErosionStage {
    pub fn new(params: ErosionParams, droplets: u64, seed: u64) -> Self {
        Self {
            params,
            droplets,
            seed,
            passes: 1,
            clamp: None,
        }
    }

    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_clamp(mut self, min: f64, max: f64) -> Self {
        self.clamp = Some((min, max));
        self
    }

    /// Droplets run by each pass; the last pass takes the remainder.
    fn pass_sizes(&self) -> Vec<u64> {
        let passes = self.passes as u64;
        let base = self.droplets / passes;
        let mut sizes = vec![base; self.passes as usize];
        if let Some(last) = sizes.last_mut() {
            *last += self.droplets % passes;
        }
        sizes
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.passes < 1 {
            return Err(ConfigError::OutOfRange {
                name: "passes",
                expected: ">= 1",
                value: self.passes as f64,
            });
        }
        if let Some((min, max)) = self.clamp {
            if !(min <= max) {
                return Err(ConfigError::OutOfRange {
                    name: "clamp_min",
                    expected: "<= clamp_max",
                    value: min,
                });
            }
        }
        Ok(())
    }
}

impl GenerationStage for ErosionStage {
    fn id(&self) -> StageId {
        StageId::Erosion
    }

    fn name(&self) -> &str {
        "Hydraulic Erosion"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Heightmap]
    }

    fn execute(&self, grid: &mut Heightfield, config: &StageConfig) -> Result<StageReport, PipelineError> {
        self.validate()?;
        let mut engine = ErosionEngine::new(self.params.clone(), self.seed)?;

        if let Some(bad) = grid.heights().iter().position(|h| !h.is_finite()) {
            return Err(PipelineError::StageFailed(
                self.name().to_string(),
                format!("non-finite height at cell {}", bad),
            ));
        }

        let sizes = self.pass_sizes();
        let mut stats = ErosionStats::default();
        for (pass, &count) in sizes.iter().enumerate() {
            let pass_stats = engine.run_cancellable(grid, count, &config.cancel)?;
            stats.merge(&pass_stats);
            debug!(pass = pass + 1, passes = sizes.len(), droplets = count, "erosion pass finished");
        }

        let mut report = StageReport::new(self.id(), self.name());
        if let Some((min, max)) = self.clamp {
            let clamped = grid.clamp(min, max);
            info!(above = clamped.above, below = clamped.below, min, max, "clamped eroded heights");
            report.clamp = Some(clamped);
        }
        report.erosion = Some(stats);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::SmoothingOp;

    fn preview_config() -> StageConfig {
        StageConfig::with_noise(FractalNoiseConfig::preview(42))
    }

    #[test]
    fn test_pipeline_execution() {
        let mut pipeline = Pipeline::new(preview_config());
        pipeline.add_stage(HeightmapStage);

        let mut grid = Heightfield::new(32).unwrap();
        let report = pipeline.run(&mut grid).unwrap();

        let (min, max) = grid.height_range();
        assert!(min < max, "Heightmap should have variation");
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].range, (min, max));
    }

    #[test]
    fn test_heightmap_stage_matches_direct_generation() {
        let config = preview_config();
        let mut pipeline = Pipeline::new(config.clone());
        pipeline.add_stage(HeightmapStage);

        let mut grid = Heightfield::new(24).unwrap();
        pipeline.run(&mut grid).unwrap();

        let direct = FractalAccumulator::new(&config.noise).unwrap().generate(24).unwrap();
        assert_eq!(grid, direct);
    }

    #[test]
    fn test_full_pipeline_reports_erosion() {
        let mut pipeline = Pipeline::new(preview_config());
        pipeline
            .add_stage(HeightmapStage)
            .add_stage(SmoothingStage::new(SmoothingChain::rolling_plains()))
            .add_stage(
                ErosionStage::new(ErosionParams::default(), 1_000, 7)
                    .with_passes(3)
                    .with_clamp(-1000.0, 1000.0),
            );

        let mut grid = Heightfield::new(48).unwrap();
        let report = pipeline.run(&mut grid).unwrap();

        assert_eq!(pipeline.stage_count(), 3);
        let erosion = report.stage(StageId::Erosion).unwrap();
        let stats = erosion.erosion.as_ref().unwrap();
        assert_eq!(stats.droplets, 1_000);
        assert_eq!(erosion.clamp.unwrap().total(), 0);
        assert_eq!(report.erosion().unwrap().droplets, 1_000);
        assert!(grid.heights().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_clamp_bounds_applied() {
        let mut pipeline = Pipeline::new(preview_config());
        pipeline
            .add_stage(HeightmapStage)
            .add_stage(SmoothingStage::new(
                SmoothingChain::new().then(SmoothingOp::Scale { factor: 100.0 }),
            ))
            .add_stage(ErosionStage::new(ErosionParams::default(), 200, 1).with_clamp(-10.0, 10.0));

        let mut grid = Heightfield::new(32).unwrap();
        let report = pipeline.run(&mut grid).unwrap();

        let (min, max) = grid.height_range();
        assert!(min >= -10.0 && max <= 10.0);
        assert!(report.stage(StageId::Erosion).unwrap().clamp.unwrap().total() > 0);
    }

    #[test]
    fn test_pass_sizes_cover_budget() {
        let stage = ErosionStage::new(ErosionParams::default(), 10, 0).with_passes(3);
        assert_eq!(stage.pass_sizes(), vec![3, 3, 4]);
        assert_eq!(stage.pass_sizes().iter().sum::<u64>(), 10);
    }

    #[test]
    fn test_single_pass_equals_engine_run() {
        let mut a = FractalAccumulator::new(&FractalNoiseConfig::preview(3))
            .unwrap()
            .generate(32)
            .unwrap();
        let mut b = a.clone();

        ErosionStage::new(ErosionParams::default(), 300, 9)
            .execute(&mut a, &StageConfig::default())
            .unwrap();
        ErosionEngine::new(ErosionParams::default(), 9).unwrap().run(&mut b, 300);
        assert_eq!(a, b);
    }

    #[test]
    fn test_passes_share_one_spawn_stream() {
        let mut staged = FractalAccumulator::new(&FractalNoiseConfig::preview(5))
            .unwrap()
            .generate(32)
            .unwrap();
        staged.scale(256.0);
        let mut manual = staged.clone();

        let report = ErosionStage::new(ErosionParams::default(), 10, 4)
            .with_passes(3)
            .execute(&mut staged, &StageConfig::default())
            .unwrap();

        let mut engine = ErosionEngine::new(ErosionParams::default(), 4).unwrap();
        let mut stats = ErosionStats::default();
        for count in [3, 3, 4] {
            stats.merge(&engine.run(&mut manual, count));
        }

        assert_eq!(staged, manual);
        assert_eq!(report.erosion.unwrap(), stats);
    }

    #[test]
    fn test_invalid_stage_settings_rejected() {
        let mut grid = Heightfield::new(8).unwrap();
        let config = StageConfig::default();

        let zero_passes = ErosionStage::new(ErosionParams::default(), 10, 0).with_passes(0);
        assert!(matches!(zero_passes.execute(&mut grid, &config), Err(PipelineError::Config(_))));

        let inverted = ErosionStage::new(ErosionParams::default(), 10, 0).with_clamp(5.0, -5.0);
        assert!(matches!(inverted.execute(&mut grid, &config), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_non_finite_input_fails_erosion() {
        let mut grid = Heightfield::new(8).unwrap();
        grid.set(3, 3, f64::NAN);
        let stage = ErosionStage::new(ErosionParams::default(), 10, 0);
        match stage.execute(&mut grid, &StageConfig::default()) {
            Err(PipelineError::StageFailed(name, _)) => assert_eq!(name, "Hydraulic Erosion"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_dependency() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(SmoothingStage::new(SmoothingChain::new()));

        let mut grid = Heightfield::new(8).unwrap();
        match pipeline.run(&mut grid) {
            Err(PipelineError::MissingDependency(stage, dep)) => {
                assert_eq!(stage, "Smoothing");
                assert_eq!(dep, "heightmap");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_pipeline_stops_before_first_stage() {
        let cancel = CancellationToken::new();
        let mut pipeline = Pipeline::new(preview_config().with_cancel(cancel.clone()));
        pipeline.add_stage(HeightmapStage);
        cancel.cancel();

        let mut grid = Heightfield::new(16).unwrap();
        assert!(matches!(pipeline.run(&mut grid), Err(PipelineError::Cancelled(_))));
        assert!(grid.heights().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_pipeline_with_callbacks() {
        let mut pipeline = Pipeline::new(preview_config());
        pipeline.add_stage(HeightmapStage);

        let mut grid = Heightfield::new(16).unwrap();
        let mut started = false;
        let mut completed = false;

        pipeline
            .run_with_callbacks(
                &mut grid,
                |name, _, _| {
                    assert_eq!(name, "Heightmap Generation");
                    started = true;
                },
                |name, _, _| {
                    assert_eq!(name, "Heightmap Generation");
                    completed = true;
                },
            )
            .unwrap();

        assert!(started);
        assert!(completed);
    }

    #[test]
    fn test_stage_id_name() {
        assert_eq!(StageId::Heightmap.name(), "heightmap");
        assert_eq!(StageId::Erosion.name(), "erosion");
    }
}
