//! Erosion configuration.

use serde::{Deserialize, Serialize};

use crate::error::{self, ConfigError};

/// Parameters for droplet-based hydraulic erosion, fixed for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    /// Maximum number of committed moves per droplet.
    pub max_steps: u32,
    /// How much a droplet keeps its previous direction (0-1).
    pub inertia: f64,
    /// Sediment capacity factor.
    pub sediment_capacity: f64,
    /// Fraction of spare capacity picked up per step.
    pub erosion_rate: f64,
    /// Fraction of excess sediment dropped per step.
    pub deposition_rate: f64,
    /// Fraction of water lost per step (0-1).
    pub evaporation_rate: f64,
    /// Scales the velocity change from a height difference.
    pub gravity: f64,
    /// Slopes below this are treated as flat; also the capacity floor.
    pub min_slope: f64,
    /// Distance moved per step, in cells.
    pub cell_size: f64,
    /// Step used for the central-difference gradient.
    pub gradient_epsilon: f64,
    /// A droplet evaporates once its water drops below this.
    pub min_water: f64,
    /// Water volume of a freshly spawned droplet.
    pub initial_water: f64,
    /// Speed of a freshly spawned droplet.
    pub initial_velocity: f64,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            max_steps: 64,
            inertia: 0.3,
            sediment_capacity: 4.0,
            erosion_rate: 0.3,
            deposition_rate: 0.3,
            evaporation_rate: 1.0 / 512.0,
            gravity: 4.0,
            min_slope: 0.01,
            cell_size: 1.0,
            gradient_epsilon: 1e-5,
            min_water: 0.01,
            initial_water: 1.0,
            initial_velocity: 0.0,
        }
    }
}

impl ErosionParams {
    /// Short-lived, fast-drying droplets that mostly touch up fine detail.
    pub fn light() -> Self {
        Self {
            max_steps: 30,
            evaporation_rate: 0.05,
            erosion_rate: 0.1,
            deposition_rate: 0.1,
            ..Default::default()
        }
    }

    /// Long-lived droplets that carve deep channels.
    pub fn heavy() -> Self {
        Self {
            max_steps: 128,
            inertia: 0.05,
            sediment_capacity: 8.0,
            erosion_rate: 0.5,
            deposition_rate: 0.2,
            ..Default::default()
        }
    }

    /// Checks every parameter; called by the erosion engine constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps < 1 {
            return Err(ConfigError::OutOfRange {
                name: "max_steps",
                expected: ">= 1",
                value: self.max_steps as f64,
            });
        }
        error::unit_interval("inertia", self.inertia)?;
        error::non_negative("sediment_capacity", self.sediment_capacity)?;
        error::non_negative("erosion_rate", self.erosion_rate)?;
        error::non_negative("deposition_rate", self.deposition_rate)?;
        error::unit_interval("evaporation_rate", self.evaporation_rate)?;
        error::non_negative("gravity", self.gravity)?;
        error::non_negative("min_slope", self.min_slope)?;
        error::positive("cell_size", self.cell_size)?;
        error::positive("gradient_epsilon", self.gradient_epsilon)?;
        error::non_negative("min_water", self.min_water)?;
        error::positive("initial_water", self.initial_water)?;
        error::non_negative("initial_velocity", self.initial_velocity)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = ErosionParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.evaporation_rate, 1.0 / 512.0);
        assert_eq!(params.min_water, 0.01);
        assert!(ErosionParams::light().validate().is_ok());
        assert!(ErosionParams::heavy().validate().is_ok());
    }

    #[test]
    fn test_negative_rate_rejected() {
        let params = ErosionParams {
            deposition_rate: -0.1,
            ..Default::default()
        };
        match params.validate() {
            Err(ConfigError::OutOfRange { name, .. }) => assert_eq!(name, "deposition_rate"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_steps_and_inertia_bounds() {
        let zero_steps = ErosionParams {
            max_steps: 0,
            ..Default::default()
        };
        assert!(zero_steps.validate().is_err());

        let inertia = ErosionParams {
            inertia: 1.2,
            ..Default::default()
        };
        assert!(inertia.validate().is_err());

        let step = ErosionParams {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(step.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: ErosionParams =
            serde_json::from_str(r#"{ "max_steps": 10, "gravity": 9.0 }"#).unwrap();
        assert_eq!(params.max_steps, 10);
        assert_eq!(params.gravity, 9.0);
        assert_eq!(params.inertia, ErosionParams::default().inertia);
    }
}
