//! Independent-variable modes of a batch call.

use crate::error::{MixError, MixResult};
use serde::{Deserialize, Serialize};

/// Which per-cell pair is the input; the remaining per-cell fields are outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// `press`, `temp` in
    PressureTemperature,
    /// `spvol`, `sie` in
    DensityEnergy,
    /// `spvol`, `press` in
    DensityPressure,
    /// `spvol`, `temp` in
    DensityTemperature,
}

impl InputMode {
    /// Decode the integer selector used at the flat-array boundary.
    pub fn from_input_int(value: i32) -> MixResult<Self> {
        match value {
            -1 => Ok(InputMode::PressureTemperature),
            0 => Ok(InputMode::DensityEnergy),
            1 => Ok(InputMode::DensityPressure),
            2 => Ok(InputMode::DensityTemperature),
            _ => Err(MixError::MalformedBatch {
                what: format!("unknown input mode {value}"),
            }),
        }
    }

    pub fn input_int(self) -> i32 {
        match self {
            InputMode::PressureTemperature => -1,
            InputMode::DensityEnergy => 0,
            InputMode::DensityPressure => 1,
            InputMode::DensityTemperature => 2,
        }
    }

    /// True if the cell density is an input.
    pub fn density_is_input(self) -> bool {
        !matches!(self, InputMode::PressureTemperature)
    }

    pub fn label(self) -> &'static str {
        match self {
            InputMode::PressureTemperature => "P-T",
            InputMode::DensityEnergy => "rho-e",
            InputMode::DensityPressure => "rho-P",
            InputMode::DensityTemperature => "rho-T",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_round_trips() {
        for v in -1..=2 {
            assert_eq!(InputMode::from_input_int(v).unwrap().input_int(), v);
        }
        assert!(InputMode::from_input_int(3).is_err());
    }

    #[test]
    fn only_pressure_temperature_derives_density() {
        assert!(!InputMode::PressureTemperature.density_is_input());
        assert!(InputMode::DensityEnergy.density_is_input());
    }
}
