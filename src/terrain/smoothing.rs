//! Per-cell remap functions that reshape the elevation distribution.
//!
//! All functions are defined over roughly [-1, 1] and keep the sign of their input.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use super::heightfield::Heightfield;
use crate::error::{self, ConfigError};

/// Flattens the mid range: `sign(h) · (sin(π·h − π/2)/2 + 0.5)`.
pub fn great_plains(h: f64) -> f64 {
    ((PI * h - FRAC_PI_2).sin() / 2.0 + 0.5).copysign(h)
}

/// Steepens near zero: `sign(h) · sqrt(|h|)`.
pub fn cliff(h: f64) -> f64 {
    h.abs().sqrt().copysign(h)
}

/// Blend of [`great_plains`] (weight `level`) and [`cliff`].
pub fn plateau(h: f64, level: f64) -> f64 {
    level * great_plains(h) + (1.0 - level) * cliff(h)
}

/// Height-weighted mix: cliffs dominate low ground, plains high ground.
pub fn molone(h: f64, level: f64) -> f64 {
    (1.0 - h) * level * cliff(h) + h * (1.0 - level) * great_plains(h)
}

/// One step of a [`SmoothingChain`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SmoothingOp {
    GreatPlains,
    Cliff,
    Plateau { level: f64 },
    Molone { level: f64 },
    /// `weight · great_plains(h) + (1 − weight) · h`.
    PlainsBlend { weight: f64 },
    /// Multiplies by a constant, e.g. the final ×256 height rescale.
    Scale { factor: f64 },
}

impl SmoothingOp {
    pub fn apply(&self, h: f64) -> f64 {
        match *self {
            SmoothingOp::GreatPlains => great_plains(h),
            SmoothingOp::Cliff => cliff(h),
            SmoothingOp::Plateau { level } => plateau(h, level),
            SmoothingOp::Molone { level } => molone(h, level),
            SmoothingOp::PlainsBlend { weight } => weight * great_plains(h) + (1.0 - weight) * h,
            SmoothingOp::Scale { factor } => h * factor,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            SmoothingOp::Plateau { level } | SmoothingOp::Molone { level } => {
                error::unit_interval("level", level)
            }
            SmoothingOp::PlainsBlend { weight } => error::unit_interval("weight", weight),
            SmoothingOp::Scale { factor } if !factor.is_finite() => Err(ConfigError::OutOfRange {
                name: "factor",
                expected: "finite",
                value: factor,
            }),
            _ => Ok(()),
        }
    }
}

/// An ordered composition of [`SmoothingOp`]s applied to every cell.
///
/// The empty chain is the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SmoothingChain {
    ops: Vec<SmoothingOp>,
}

impl SmoothingChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` to the end of the chain.
    pub fn then(mut self, op: SmoothingOp) -> Self {
        self.ops.push(op);
        self
    }

    /// A 0.75 plains blend followed by a ×256 height rescale.
    pub fn rolling_plains() -> Self {
        Self::new()
            .then(SmoothingOp::PlainsBlend { weight: 0.75 })
            .then(SmoothingOp::Scale { factor: 256.0 })
    }

    pub fn ops(&self) -> &[SmoothingOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ops.iter().try_for_each(SmoothingOp::validate)
    }

    /// Runs every op in order on a single value.
    pub fn apply(&self, h: f64) -> f64 {
        self.ops.iter().fold(h, |acc, op| op.apply(acc))
    }

    /// Remaps every cell of `grid`.
    pub fn apply_to(&self, grid: &mut Heightfield) {
        if self.is_identity() {
            return;
        }
        grid.map_in_place(|h| self.apply(h));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_great_plains_values() {
        let expected = (PI * 0.6 - PI / 2.0).sin() / 2.0 + 0.5;
        assert!((great_plains(0.6) - expected).abs() < EPS);
        assert!((great_plains(0.6) - 0.654_508_497).abs() < 1e-6);

        assert_eq!(great_plains(0.0), 0.0);
        assert!((great_plains(1.0) - 1.0).abs() < EPS);
        assert!((great_plains(0.5) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_sign_is_preserved() {
        for &h in &[-0.9, -0.4, -0.05, 0.05, 0.4, 0.9] {
            assert_eq!(great_plains(h).signum(), h.signum());
            assert_eq!(cliff(h).signum(), h.signum());
        }
    }

    #[test]
    fn test_cliff_values() {
        assert!((cliff(0.25) - 0.5).abs() < EPS);
        assert!((cliff(-0.25) + 0.5).abs() < EPS);
        assert_eq!(cliff(1.0), 1.0);
    }

    #[test]
    fn test_plateau_endpoints() {
        let h = 0.3;
        assert!((plateau(h, 1.0) - great_plains(h)).abs() < EPS);
        assert!((plateau(h, 0.0) - cliff(h)).abs() < EPS);
    }

    #[test]
    fn test_molone_formula() {
        let (h, level) = (0.4, 0.3);
        let expected = 0.6 * 0.3 * cliff(h) + 0.4 * 0.7 * great_plains(h);
        assert!((molone(h, level) - expected).abs() < EPS);
    }

    #[test]
    fn test_chain_applies_in_order() {
        let chain = SmoothingChain::new()
            .then(SmoothingOp::Cliff)
            .then(SmoothingOp::Scale { factor: 10.0 });
        assert!((chain.apply(0.25) - 5.0).abs() < EPS);

        let reversed = SmoothingChain::new()
            .then(SmoothingOp::Scale { factor: 10.0 })
            .then(SmoothingOp::Cliff);
        assert!((reversed.apply(0.25) - 2.5f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_identity_chain() {
        let chain = SmoothingChain::new();
        assert!(chain.is_identity());
        let mut grid = Heightfield::from_vec(2, vec![-0.5, 0.1, 0.2, 0.9]).unwrap();
        let before = grid.clone();
        chain.apply_to(&mut grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_rolling_plains_on_grid() {
        let chain = SmoothingChain::rolling_plains();
        let mut grid = Heightfield::filled(3, 0.6).unwrap();
        chain.apply_to(&mut grid);
        let expected = (0.75 * great_plains(0.6) + 0.25 * 0.6) * 256.0;
        assert!(grid.heights().iter().all(|&h| (h - expected).abs() < 1e-9));
    }

    #[test]
    fn test_validate_levels() {
        assert!(SmoothingChain::new()
            .then(SmoothingOp::Plateau { level: 0.5 })
            .validate()
            .is_ok());
        assert!(SmoothingChain::new()
            .then(SmoothingOp::Molone { level: 1.5 })
            .validate()
            .is_err());
    }

    #[test]
    fn test_chain_from_json() {
        let chain: SmoothingChain = serde_json::from_str(
            r#"[{"op":"great_plains"},{"op":"plateau","level":0.25},{"op":"scale","factor":256.0}]"#,
        )
        .unwrap();
        assert_eq!(
            chain.ops(),
            &[
                SmoothingOp::GreatPlains,
                SmoothingOp::Plateau { level: 0.25 },
                SmoothingOp::Scale { factor: 256.0 },
            ]
        );
    }
}
