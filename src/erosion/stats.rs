//! Diagnostics collected over an erosion run.

use serde::{Deserialize, Serialize};

use super::droplet::Termination;
use super::engine::DropletReport;

/// How many droplets ended for each [`Termination`] reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationCounts {
    pub off_map: u64,
    pub no_direction: u64,
    pub evaporated: u64,
    pub max_steps_reached: u64,
    pub non_finite: u64,
}

impl TerminationCounts {
    pub fn record(&mut self, reason: Termination) {
        *self.slot_mut(reason) += 1;
    }

    pub fn get(&self, reason: Termination) -> u64 {
        match reason {
            Termination::OffMap => self.off_map,
            Termination::NoDirection => self.no_direction,
            Termination::Evaporated => self.evaporated,
            Termination::MaxStepsReached => self.max_steps_reached,
            Termination::NonFinite => self.non_finite,
        }
    }

    pub fn total(&self) -> u64 {
        Termination::ALL.iter().map(|&t| self.get(t)).sum()
    }

    fn slot_mut(&mut self, reason: Termination) -> &mut u64 {
        match reason {
            Termination::OffMap => &mut self.off_map,
            Termination::NoDirection => &mut self.no_direction,
            Termination::Evaporated => &mut self.evaporated,
            Termination::MaxStepsReached => &mut self.max_steps_reached,
            Termination::NonFinite => &mut self.non_finite,
        }
    }
}

/// Aggregate statistics for one or more erosion runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErosionStats {
    /// Droplets simulated to termination.
    pub droplets: u64,
    pub terminations: TerminationCounts,
    /// Committed moves over all droplets.
    pub total_steps: u64,
    /// Longest droplet path, in committed moves.
    pub max_steps: u32,
    /// Material picked up by droplets.
    pub total_eroded: f64,
    /// Material dropped back onto the grid.
    pub total_deposited: f64,
    /// Sediment still carried by droplets when they terminated.
    pub sediment_in_transit: f64,
}

impl ErosionStats {
    /// Folds one finished droplet into the totals.
    pub fn record(&mut self, report: &DropletReport) {
        self.droplets += 1;
        self.terminations.record(report.termination);
        self.total_steps += report.steps as u64;
        self.max_steps = self.max_steps.max(report.steps);
        self.total_eroded += report.eroded;
        self.total_deposited += report.deposited;
        self.sediment_in_transit += report.sediment;
    }

    /// Combines the totals of two runs.
    pub fn merge(&mut self, other: &ErosionStats) {
        self.droplets += other.droplets;
        for reason in Termination::ALL {
            *self.terminations.slot_mut(reason) += other.terminations.get(reason);
        }
        self.total_steps += other.total_steps;
        self.max_steps = self.max_steps.max(other.max_steps);
        self.total_eroded += other.total_eroded;
        self.total_deposited += other.total_deposited;
        self.sediment_in_transit += other.sediment_in_transit;
    }

    /// Average committed moves per droplet.
    pub fn mean_steps(&self) -> f64 {
        if self.droplets == 0 {
            0.0
        } else {
            self.total_steps as f64 / self.droplets as f64
        }
    }

    /// Share of droplets that ended for `reason`, in percent.
    pub fn percent(&self, reason: Termination) -> f64 {
        if self.droplets == 0 {
            0.0
        } else {
            self.terminations.get(reason) as f64 / self.droplets as f64 * 100.0
        }
    }
}
