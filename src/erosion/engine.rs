//! Sequential droplet erosion over a shared heightfield.
//!
//! Droplets are simulated one after another; each one reads and writes the
//! grid left by its predecessors, so a run is fully determined by the grid,
//! the parameters and the spawn generator's seed.

use std::time::Instant;

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::ErosionParams;
use super::droplet::{Droplet, Termination};
use super::stats::ErosionStats;
use crate::cancel::{CancellationToken, Cancelled};
use crate::error::ConfigError;
use crate::terrain::Heightfield;

/// Outcome of one simulated droplet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropletReport {
    pub termination: Termination,
    /// Committed moves.
    pub steps: u32,
    /// Material picked up over the droplet's life.
    pub eroded: f64,
    /// Material dropped over the droplet's life.
    pub deposited: f64,
    /// Sediment still carried at termination.
    pub sediment: f64,
    /// Last committed position.
    pub position: DVec2,
}

/// Runs droplets over a heightfield with an injected spawn generator.
///
/// The default generator is a seeded [`ChaCha8Rng`], so `new(params, seed)`
/// always spawns the same droplet sequence.
#[derive(Debug, Clone)]
pub struct ErosionEngine<R = ChaCha8Rng> {
    params: ErosionParams,
    rng: R,
}

impl ErosionEngine<ChaCha8Rng> {
    /// Validates `params` and seeds the spawn generator.
    pub fn new(params: ErosionParams, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(params, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ErosionEngine<R> {
    /// Validates `params` and uses `rng` for droplet spawn positions.
    pub fn with_rng(params: ErosionParams, rng: R) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params, rng })
    }

    pub fn params(&self) -> &ErosionParams {
        &self.params
    }

    /// Draws a spawn position uniformly from `[0, width − 1) × [0, height − 1)`.
    pub fn spawn_position(&mut self, grid: &Heightfield) -> DVec2 {
        let x = self.rng.random::<f64>() * (grid.width() - 1) as f64;
        let y = self.rng.random::<f64>() * (grid.height() - 1) as f64;
        DVec2::new(x, y)
    }

    /// Simulates one droplet from `start` until it terminates.
    pub fn simulate_droplet(&self, grid: &mut Heightfield, start: DVec2) -> DropletReport {
        let mut droplet = Droplet::spawn(start, &self.params);
        let transfer = droplet.run(grid, &self.params);

        let termination = droplet
            .termination()
            .unwrap_or(Termination::MaxStepsReached);
        if termination == Termination::NonFinite {
            warn!(x = start.x, y = start.y, steps = droplet.steps(), "droplet hit a non-finite state");
        }

        DropletReport {
            termination,
            steps: droplet.steps(),
            eroded: transfer.eroded,
            deposited: transfer.deposited,
            sediment: droplet.sediment(),
            position: droplet.position(),
        }
    }

    /// Runs `droplets` droplets at random positions.
    pub fn run(&mut self, grid: &mut Heightfield, droplets: u64) -> ErosionStats {
        let (stats, _) = self.run_until(grid, droplets, || false);
        stats
    }

    /// Like [`run`](Self::run), checking `cancel` before every droplet.
    ///
    /// Droplets finished before cancellation stay applied to the grid.
    pub fn run_cancellable(
        &mut self,
        grid: &mut Heightfield,
        droplets: u64,
        cancel: &CancellationToken,
    ) -> Result<ErosionStats, Cancelled> {
        let (stats, stopped) = self.run_until(grid, droplets, || cancel.is_cancelled());
        if stopped {
            info!(completed = stats.droplets, requested = droplets, "erosion cancelled");
            Err(Cancelled)
        } else {
            Ok(stats)
        }
    }

    fn run_until<F>(&mut self, grid: &mut Heightfield, droplets: u64, mut should_stop: F) -> (ErosionStats, bool)
    where
        F: FnMut() -> bool,
    {
        let start = Instant::now();
        let mut stats = ErosionStats::default();
        let report_interval = (droplets / 10).max(1);

        debug!(droplets, size = grid.size(), "starting hydraulic erosion");

        for d in 0..droplets {
            if should_stop() {
                return (stats, true);
            }

            if d > 0 && d % report_interval == 0 {
                let elapsed = start.elapsed().as_secs_f64();
                let done = d as f64 / droplets as f64;
                debug!(
                    percent = done * 100.0,
                    remaining_s = elapsed / done - elapsed,
                    droplets_per_s = d as f64 / elapsed,
                    "erosion progress"
                );
            }

            let position = self.spawn_position(grid);
            let report = self.simulate_droplet(grid, position);
            stats.record(&report);
        }

        let elapsed = start.elapsed().as_secs_f64();
        info!(
            droplets = stats.droplets,
            elapsed_s = elapsed,
            mean_steps = stats.mean_steps(),
            max_steps = stats.max_steps,
            evaporated = stats.terminations.evaporated,
            off_map = stats.terminations.off_map,
            no_direction = stats.terminations.no_direction,
            step_limit = stats.terminations.max_steps_reached,
            non_finite = stats.terminations.non_finite,
            eroded = stats.total_eroded,
            deposited = stats.total_deposited,
            "hydraulic erosion finished"
        );

        (stats, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{generate_heightfield, FractalNoiseConfig};
    use crate::terrain::SmoothingChain;

    fn bowl(size: usize) -> Heightfield {
        let c = (size as f64 - 1.0) / 2.0;
        Heightfield::from_fn(size, |x, y| {
            let dx = x as f64 - c;
            let dy = y as f64 - c;
            5.0 + 0.05 * (dx * dx + dy * dy)
        })
        .unwrap()
    }

    fn noise_terrain(seed: u64) -> Heightfield {
        let mut grid = generate_heightfield(&FractalNoiseConfig::preview(seed), 64).unwrap();
        SmoothingChain::rolling_plains().apply_to(&mut grid);
        grid
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = ErosionParams {
            erosion_rate: -1.0,
            ..Default::default()
        };
        assert!(ErosionEngine::new(params, 0).is_err());
    }

    #[test]
    fn test_single_droplet_conserves_mass() {
        let mut grid = bowl(32);
        let before = grid.total();
        let engine = ErosionEngine::new(ErosionParams::default(), 0).unwrap();

        let report = engine.simulate_droplet(&mut grid, DVec2::new(20.3, 18.7));

        assert_ne!(report.termination, Termination::OffMap);
        assert!(report.eroded > 0.0);
        let after = grid.total();
        assert!(
            (before - (after + report.sediment)).abs() < 1e-9,
            "before {} after {} carried {}",
            before,
            after,
            report.sediment
        );
    }

    #[test]
    fn test_every_droplet_respects_step_limit() {
        for max_steps in [1, 5, 40] {
            let params = ErosionParams {
                max_steps,
                evaporation_rate: 0.0,
                ..Default::default()
            };
            let mut grid = noise_terrain(3);
            let mut engine = ErosionEngine::new(params, 11).unwrap();
            for _ in 0..200 {
                let start = engine.spawn_position(&grid);
                let report = engine.simulate_droplet(&mut grid, start);
                assert!(report.steps <= max_steps);
            }
        }
    }

    #[test]
    fn test_run_is_reproducible() {
        let mut a = noise_terrain(0);
        let mut b = noise_terrain(0);

        let stats_a = ErosionEngine::new(ErosionParams::default(), 42).unwrap().run(&mut a, 500);
        let stats_b = ErosionEngine::new(ErosionParams::default(), 42).unwrap().run(&mut b, 500);

        assert_eq!(a, b);
        assert_eq!(stats_a, stats_b);
        assert_eq!(stats_a.droplets, 500);
        assert_eq!(stats_a.terminations.total(), 500);
    }

    #[test]
    fn test_spawn_seed_changes_result() {
        let mut a = noise_terrain(0);
        let mut b = noise_terrain(0);
        ErosionEngine::new(ErosionParams::default(), 1).unwrap().run(&mut a, 200);
        ErosionEngine::new(ErosionParams::default(), 2).unwrap().run(&mut b, 200);
        assert_ne!(a, b);
    }

    #[test]
    fn test_injected_rng_matches_seeded() {
        let mut a = bowl(16);
        let mut b = bowl(16);
        let rng = ChaCha8Rng::seed_from_u64(5);
        ErosionEngine::with_rng(ErosionParams::default(), rng).unwrap().run(&mut a, 50);
        ErosionEngine::new(ErosionParams::default(), 5).unwrap().run(&mut b, 50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_spawn_positions_stay_inside() {
        let grid = Heightfield::new(10).unwrap();
        let mut engine = ErosionEngine::new(ErosionParams::default(), 9).unwrap();
        for _ in 0..1000 {
            let p = engine.spawn_position(&grid);
            assert!(p.x >= 0.0 && p.x < 9.0);
            assert!(p.y >= 0.0 && p.y < 9.0);
        }
    }

    #[test]
    fn test_single_cell_grid() {
        let mut grid = Heightfield::filled(1, 3.0).unwrap();
        let stats = ErosionEngine::new(ErosionParams::default(), 0).unwrap().run(&mut grid, 10);
        assert_eq!(stats.terminations.no_direction, 10);
        assert_eq!(grid.get(0, 0), 3.0);
    }

    #[test]
    fn test_erosion_keeps_positive_terrain_positive() {
        let mut grid = bowl(32);
        let params = ErosionParams::heavy();
        ErosionEngine::new(params, 4).unwrap().run(&mut grid, 2000);
        assert!(grid.heights().iter().all(|&h| h >= 0.0 && h.is_finite()));
    }

    #[test]
    fn test_cancelled_run_leaves_grid_untouched() {
        let mut grid = bowl(16);
        let before = grid.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut engine = ErosionEngine::new(ErosionParams::default(), 0).unwrap();
        assert_eq!(engine.run_cancellable(&mut grid, 100, &cancel), Err(Cancelled));
        assert_eq!(grid, before);

        let live = CancellationToken::new();
        let stats = engine.run_cancellable(&mut grid, 100, &live).unwrap();
        assert_eq!(stats.droplets, 100);
    }
}
