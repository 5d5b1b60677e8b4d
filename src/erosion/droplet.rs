//! A single water droplet and its per-step state machine.
//!
//! A droplet is spawned, moves one cell-size step at a time while eroding or
//! depositing around its pre-move position, and ends in exactly one
//! [`Termination`].

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::config::ErosionParams;
use crate::terrain::{bilinear_footprint, gradient, interpolate_height, Heightfield};

/// Why a droplet stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// The next position fell outside the grid.
    OffMap,
    /// Inertia and slope cancelled out; there is no direction to move in.
    NoDirection,
    /// Water dropped below the minimum.
    Evaporated,
    /// The step limit was reached.
    MaxStepsReached,
    /// Position, direction or a sampled height became NaN or infinite.
    NonFinite,
}

impl Termination {
    pub const ALL: [Termination; 5] = [
        Termination::OffMap,
        Termination::NoDirection,
        Termination::Evaporated,
        Termination::MaxStepsReached,
        Termination::NonFinite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Termination::OffMap => "off_map",
            Termination::NoDirection => "no_direction",
            Termination::Evaporated => "evaporated",
            Termination::MaxStepsReached => "max_steps",
            Termination::NonFinite => "non_finite",
        }
    }
}

/// Lifecycle of a droplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropletState {
    Spawned,
    Moving,
    Terminated(Termination),
}

/// Material moved between grid and droplet during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepTransfer {
    /// Picked up by the droplet (including the share of off-grid corners).
    pub eroded: f64,
    /// Dropped onto the grid.
    pub deposited: f64,
}

/// An ephemeral erosion agent.
#[derive(Debug, Clone)]
pub struct Droplet {
    position: DVec2,
    direction: DVec2,
    velocity: f64,
    water: f64,
    sediment: f64,
    steps: u32,
    state: DropletState,
}

impl Droplet {
    /// Creates a droplet at rest at `position` with the configured water and speed.
    pub fn spawn(position: DVec2, params: &ErosionParams) -> Self {
        Self {
            position,
            direction: DVec2::ZERO,
            velocity: params.initial_velocity,
            water: params.initial_water,
            sediment: 0.0,
            steps: 0,
            state: DropletState::Spawned,
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn direction(&self) -> DVec2 {
        self.direction
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn water(&self) -> f64 {
        self.water
    }

    /// Sediment currently carried.
    pub fn sediment(&self) -> f64 {
        self.sediment
    }

    /// Committed moves so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn state(&self) -> DropletState {
        self.state
    }

    /// The termination reason, once the droplet has stopped.
    pub fn termination(&self) -> Option<Termination> {
        match self.state {
            DropletState::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.termination().is_some()
    }

    /// Advances the droplet by one step, eroding or depositing into `grid`.
    ///
    /// A terminated droplet is left untouched and transfers nothing.
    pub fn step(&mut self, grid: &mut Heightfield, params: &ErosionParams) -> StepTransfer {
        if self.is_terminated() {
            return StepTransfer::default();
        }
        self.state = DropletState::Moving;

        match self.advance(grid, params) {
            Ok(transfer) => transfer,
            Err(reason) => {
                self.state = DropletState::Terminated(reason);
                StepTransfer::default()
            }
        }
    }

    /// Runs the step loop until the droplet terminates.
    ///
    /// Returns the accumulated transfer. At most `max_steps` steps are taken.
    pub fn run(&mut self, grid: &mut Heightfield, params: &ErosionParams) -> StepTransfer {
        let mut total = StepTransfer::default();
        while !self.is_terminated() {
            let transfer = self.step(grid, params);
            total.eroded += transfer.eroded;
            total.deposited += transfer.deposited;
        }
        total
    }

    /// One step. `Err` terminates before any material moves.
    fn advance(
        &mut self,
        grid: &mut Heightfield,
        params: &ErosionParams,
    ) -> Result<StepTransfer, Termination> {
        let pos = self.position;
        if !pos.is_finite() {
            return Err(Termination::NonFinite);
        }

        let mut grad = gradient(grid, pos.x, pos.y, params.gradient_epsilon);
        if !grad.is_finite() {
            return Err(Termination::NonFinite);
        }
        if grad.length() < params.min_slope {
            grad = DVec2::ZERO;
        }

        // Blend the old heading with the downhill direction.
        let dir = self.direction * params.inertia - grad * (1.0 - params.inertia);
        let len = dir.length();
        if !len.is_finite() {
            return Err(Termination::NonFinite);
        }
        if len == 0.0 {
            return Err(Termination::NoDirection);
        }
        self.direction = dir / len;

        let next = pos + self.direction * params.cell_size;
        if !next.is_finite() {
            return Err(Termination::NonFinite);
        }
        if next.x < 0.0
            || next.x >= grid.width() as f64
            || next.y < 0.0
            || next.y >= grid.height() as f64
        {
            return Err(Termination::OffMap);
        }

        let delta_h = interpolate_height(grid, next.x, next.y) - interpolate_height(grid, pos.x, pos.y);
        if !delta_h.is_finite() {
            return Err(Termination::NonFinite);
        }

        let capacity = (-delta_h * self.velocity * params.sediment_capacity).max(params.min_slope);

        let mut transfer = StepTransfer::default();
        if self.sediment > capacity || delta_h > 0.0 {
            transfer.deposited = self.deposit(grid, pos, capacity, params);
        } else {
            transfer.eroded = self.erode(grid, pos, capacity, delta_h, params);
        }

        // Droplets speed up when descending.
        self.velocity = (self.velocity * self.velocity - delta_h * params.gravity)
            .max(0.0)
            .sqrt();

        self.water *= 1.0 - params.evaporation_rate;
        if self.water < params.min_water {
            self.state = DropletState::Terminated(Termination::Evaporated);
            return Ok(transfer);
        }

        self.position = next;
        self.steps += 1;
        if self.steps >= params.max_steps {
            self.state = DropletState::Terminated(Termination::MaxStepsReached);
        }
        Ok(transfer)
    }

    /// Drops part of the excess load around `pos`. Returns the amount dropped.
    fn deposit(&mut self, grid: &mut Heightfield, pos: DVec2, capacity: f64, params: &ErosionParams) -> f64 {
        let amount = ((self.sediment - capacity) * params.deposition_rate)
            .max(0.0)
            .min(self.sediment);
        if amount <= 0.0 {
            return 0.0;
        }

        let footprint = bilinear_footprint(grid, pos.x, pos.y);
        let weight_sum = footprint.weight_sum();
        if weight_sum <= 0.0 {
            return 0.0;
        }

        // Off-grid corners are folded back into the in-bounds ones.
        let heights = grid.heights_mut();
        for cell in footprint.iter() {
            heights[cell.index] += amount * cell.weight / weight_sum;
        }
        self.sediment -= amount;
        amount
    }

    /// Picks up material around `pos`. Returns the sediment gained.
    fn erode(
        &mut self,
        grid: &mut Heightfield,
        pos: DVec2,
        capacity: f64,
        delta_h: f64,
        params: &ErosionParams,
    ) -> f64 {
        let amount = ((capacity - self.sediment) * params.erosion_rate)
            .min(-delta_h)
            .max(0.0);
        if amount <= 0.0 {
            return 0.0;
        }

        let footprint = bilinear_footprint(grid, pos.x, pos.y);
        let heights = grid.heights_mut();
        let mut removed = 0.0;
        for cell in footprint.iter() {
            let h = &mut heights[cell.index];
            // Never dig a cell below zero.
            let take = (amount * cell.weight).min(h.max(0.0));
            *h -= take;
            removed += take;
        }

        let weight_sum = footprint.weight_sum();
        let off_grid = if weight_sum > 0.0 {
            amount * (1.0 - weight_sum).max(0.0)
        } else {
            0.0
        };

        let gained = removed + off_grid;
        self.sediment += gained;
        gained
    }
}
